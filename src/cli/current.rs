//! `current` subcommand

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Args;
use futures::future::join_all;
use tracing::warn;

use crate::PlannerError;
use crate::catalog;
use crate::config::PlannerConfig;
use crate::models::CurrentConditions;
use crate::weather::{CityQuery, OpenWeatherClient};

/// Arguments of the `current` subcommand.
#[derive(Args, Debug)]
pub struct CurrentArgs {
    /// State name, case-insensitive.
    #[arg(long)]
    pub state: String,

    /// Single city; defaults to the state's candidate cities.
    #[arg(long)]
    pub city: Option<String>,

    /// Print the conditions as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CurrentArgs {
    pub async fn run(&self, config: &PlannerConfig) -> Result<()> {
        let state = catalog::canonical_state(&self.state).ok_or_else(|| {
            PlannerError::validation(format!("Unknown US state: '{}'", self.state.trim()))
        })?;
        let cities: Vec<String> = match &self.city {
            Some(city) => vec![city.clone()],
            None => catalog::candidate_cities(state, config.defaults.max_cities as usize)?
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        let client = OpenWeatherClient::new(config)?;

        let queries: Vec<CityQuery> = cities.iter().map(|c| CityQuery::us(c, state)).collect();
        let results = join_all(queries.iter().map(|query| client.current(query))).await;

        let mut conditions = Vec::with_capacity(results.len());
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(current) => conditions.push(current),
                Err(e) => {
                    warn!("Current weather failed for {}: {e:#}", query.city);
                    return Err(e).with_context(|| {
                        format!("Failed to fetch current weather for {}", query.city)
                    });
                }
            }
        }

        if self.json {
            let json = serde_json::to_string_pretty(&conditions)
                .with_context(|| "Failed to serialize current conditions")?;
            println!("{json}");
        } else {
            print!("{}", render_current(state, &conditions));
        }
        Ok(())
    }
}

/// Plain-text current conditions, one line per city
#[must_use]
pub fn render_current(state: &str, conditions: &[CurrentConditions]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{state}: current conditions");
    let _ = writeln!(
        out,
        "{:<20} {:<26} {:>8} {:>8}  {}",
        "City", "Temperature", "Humidity", "Wind", "Conditions"
    );
    for current in conditions {
        let _ = writeln!(
            out,
            "{:<20} {:<26} {:>7.0}% {:>4.0} mph  {}",
            current.city,
            current.format_temperature(),
            current.humidity,
            current.wind_speed,
            current.condition_text
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_render_current() {
        let conditions = vec![CurrentConditions {
            city: "Austin".to_string(),
            observed_at: DateTime::from_timestamp(1_748_102_400, 0).unwrap(),
            temperature: 78.4,
            feels_like: 79.1,
            humidity: 48.0,
            wind_speed: 9.2,
            condition_text: "scattered clouds".to_string(),
        }];
        let table = render_current("Texas", &conditions);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Texas: current conditions");
        assert!(lines[2].starts_with("Austin"));
        assert!(lines[2].contains("78°F (feels like 79°F)"));
        assert!(lines[2].contains("48%"));
        assert!(lines[2].contains("9 mph"));
        assert!(lines[2].ends_with("scattered clouds"));
    }
}
