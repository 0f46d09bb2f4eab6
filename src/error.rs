//! Error types and handling for the holiday weather planner

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the planner
#[derive(Error, Debug)]
pub enum PlannerError {
    /// A snapshot carried out-of-range or non-finite values
    #[error("Invalid snapshot for {city} on {date}: {message}")]
    InvalidSnapshot {
        city: String,
        date: NaiveDate,
        message: String,
    },

    /// A city is missing days of the target window
    #[error("Incomplete forecast for {city}: {message}")]
    IncompleteForecast { city: String, message: String },

    /// Nothing to rank
    #[error("No city forecasts supplied")]
    EmptyInput,

    /// The same city was supplied twice
    #[error("City supplied more than once: {city}")]
    DuplicateCity { city: String },

    /// The window ends after the last forecast day available
    #[error("{window} is beyond the forecast horizon (last forecast day {last_day})")]
    BeyondForecastHorizon { window: String, last_day: NaiveDate },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl PlannerError {
    /// Create a new invalid snapshot error
    pub fn invalid_snapshot<C: Into<String>, S: Into<String>>(
        city: C,
        date: NaiveDate,
        message: S,
    ) -> Self {
        Self::InvalidSnapshot {
            city: city.into(),
            date,
            message: message.into(),
        }
    }

    /// Create a new incomplete forecast error
    pub fn incomplete_forecast<C: Into<String>, S: Into<String>>(city: C, message: S) -> Self {
        Self::IncompleteForecast {
            city: city.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::InvalidSnapshot { city, date, .. } => {
                format!("The weather provider returned unusable data for {city} on {date}.")
            }
            PlannerError::IncompleteForecast { city, .. } => {
                format!("The forecast for {city} does not cover the whole holiday weekend yet.")
            }
            PlannerError::EmptyInput => "There are no cities to compare.".to_string(),
            PlannerError::DuplicateCity { city } => {
                format!("{city} was listed more than once.")
            }
            PlannerError::BeyondForecastHorizon { last_day, .. } => {
                format!(
                    "Forecasts only reach {last_day}. Try `rank --next-days` or wait until the holiday is closer."
                )
            }
            PlannerError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            PlannerError::Api { .. } => {
                "Unable to connect to the weather service. Please check your internet connection."
                    .to_string()
            }
            PlannerError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            PlannerError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 24).unwrap();
        let snapshot_err = PlannerError::invalid_snapshot("Austin", date, "humidity 120");
        assert!(matches!(snapshot_err, PlannerError::InvalidSnapshot { .. }));

        let incomplete_err = PlannerError::incomplete_forecast("Austin", "missing 2025-05-25");
        assert!(matches!(incomplete_err, PlannerError::IncompleteForecast { .. }));

        let config_err = PlannerError::config("missing API key");
        assert!(matches!(config_err, PlannerError::Config { .. }));

        let api_err = PlannerError::api("connection failed");
        assert!(matches!(api_err, PlannerError::Api { .. }));
    }

    #[test]
    fn test_display_includes_context() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 24).unwrap();
        let err = PlannerError::invalid_snapshot("Austin", date, "humidity 120 outside 0..=100");
        let text = err.to_string();
        assert!(text.contains("Austin"));
        assert!(text.contains("2025-05-24"));
        assert!(text.contains("humidity 120"));
    }

    #[test]
    fn test_user_messages() {
        let config_err = PlannerError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = PlannerError::api("test");
        assert!(api_err.user_message().contains("Unable to connect"));

        let validation_err = PlannerError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let incomplete = PlannerError::incomplete_forecast("Boston", "missing day");
        assert!(incomplete.user_message().contains("Boston"));

        let horizon = PlannerError::BeyondForecastHorizon {
            window: "Sat May 29, 2027 to Mon May 31, 2027".to_string(),
            last_day: NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
        };
        assert!(horizon.to_string().contains("beyond the forecast horizon"));
        assert!(horizon.user_message().contains("--next-days"));
    }
}
