//! Observed weather right now

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city: String,
    pub observed_at: DateTime<Utc>,
    /// Fahrenheit
    pub temperature: f64,
    /// Fahrenheit
    pub feels_like: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    /// Miles per hour
    pub wind_speed: f64,
    pub condition_text: String,
}

impl CurrentConditions {
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!(
            "{:.0}°F (feels like {:.0}°F)",
            self.temperature, self.feels_like
        )
    }
}
