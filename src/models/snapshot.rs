//! Daily weather snapshot model and input validation

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// Plausible surface temperatures in Fahrenheit
pub const TEMPERATURE_RANGE_F: RangeInclusive<f64> = -40.0..=140.0;

/// Valid range for percentage fields
pub const PERCENT_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// One day's forecast for one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// City this snapshot belongs to
    pub city: String,
    /// Calendar day of the forecast
    pub date: NaiveDate,
    /// Daily high in Fahrenheit
    pub temperature_high: f64,
    /// Daily low in Fahrenheit
    pub temperature_low: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: f64,
    /// Wind speed in mph
    pub wind_speed: f64,
    /// Probability of precipitation percentage (0-100)
    pub precipitation_probability: f64,
    /// Human-readable description of weather conditions
    pub condition_text: String,
}

impl WeatherSnapshot {
    /// Mean of the daily high and low
    #[must_use]
    pub fn average_temperature(&self) -> f64 {
        (self.temperature_high + self.temperature_low) / 2.0
    }

    /// Reject snapshots whose values cannot come from a working provider.
    ///
    /// Values are never clamped here; a bad value usually means the upstream
    /// fetch went wrong and must surface to the caller.
    pub fn validate(&self) -> Result<(), PlannerError> {
        let fields = [
            ("temperature_high", self.temperature_high),
            ("temperature_low", self.temperature_low),
            ("humidity", self.humidity),
            ("wind_speed", self.wind_speed),
            ("precipitation_probability", self.precipitation_probability),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(self.invalid(format!("{name} is not a finite number ({value})")));
        }

        for (name, value) in [
            ("temperature_high", self.temperature_high),
            ("temperature_low", self.temperature_low),
        ] {
            if !TEMPERATURE_RANGE_F.contains(&value) {
                return Err(self.invalid(format!(
                    "{name} {value}°F outside {}..={}°F",
                    TEMPERATURE_RANGE_F.start(),
                    TEMPERATURE_RANGE_F.end()
                )));
            }
        }

        if self.temperature_low > self.temperature_high {
            return Err(self.invalid(format!(
                "temperature_low {}°F above temperature_high {}°F",
                self.temperature_low, self.temperature_high
            )));
        }

        for (name, value) in [
            ("humidity", self.humidity),
            ("precipitation_probability", self.precipitation_probability),
        ] {
            if !PERCENT_RANGE.contains(&value) {
                return Err(self.invalid(format!("{name} {value}% outside 0..=100%")));
            }
        }

        if self.wind_speed < 0.0 {
            return Err(self.invalid(format!("wind_speed {} mph is negative", self.wind_speed)));
        }

        Ok(())
    }

    fn invalid(&self, message: String) -> PlannerError {
        PlannerError::invalid_snapshot(self.city.clone(), self.date, message)
    }
}
