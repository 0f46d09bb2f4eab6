//! Configuration management for the holiday weather planner
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PlannerError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV_VAR: &str = "OPENWEATHER_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Weather API configuration
    pub weather: WeatherConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Comfort scoring thresholds
    pub comfort: ComfortConfig,
    /// Default application settings
    pub defaults: DefaultsConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key
    pub api_key: Option<String>,
    /// Base URL for weather API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_weather_max_retries")]
    pub max_retries: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether fetched forecasts are cached on disk
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u32,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Thresholds and slopes used by the comfort scorer.
///
/// Temperatures are in Fahrenheit, wind in mph, humidity and precipitation
/// in percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortConfig {
    /// Lower edge of the ideal band for the daily average
    #[serde(default = "default_ideal_low")]
    pub ideal_low_f: f64,
    /// Upper edge of the ideal band for the daily average
    #[serde(default = "default_ideal_high")]
    pub ideal_high_f: f64,
    /// Degrees outside the band charged at the near rate
    #[serde(default = "default_tolerance")]
    pub tolerance_f: f64,
    #[serde(default = "default_near_penalty")]
    pub near_penalty_per_degree: f64,
    #[serde(default = "default_far_penalty")]
    pub far_penalty_per_degree: f64,
    /// Humidity above this costs points
    #[serde(default = "default_humidity_threshold")]
    pub humidity_threshold: f64,
    #[serde(default = "default_humidity_penalty")]
    pub humidity_penalty_per_point: f64,
    /// Wind above this costs points
    #[serde(default = "default_wind_threshold")]
    pub wind_threshold_mph: f64,
    #[serde(default = "default_wind_penalty")]
    pub wind_penalty_per_mph: f64,
    /// Points lost per percentage point of rain probability
    #[serde(default = "default_precipitation_penalty")]
    pub precipitation_penalty_per_point: f64,
}

/// Default application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum number of cities compared per state
    #[serde(default = "default_max_cities")]
    pub max_cities: u32,
    /// Holiday year; the next upcoming Memorial Day when unset
    pub year: Option<i32>,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_weather_max_retries() -> u32 {
    3
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u32 {
    3
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("holiday-weather").display().to_string())
        .unwrap_or_else(|| ".holiday-weather-cache".to_string())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_ideal_low() -> f64 {
    65.0
}

fn default_ideal_high() -> f64 {
    80.0
}

fn default_tolerance() -> f64 {
    5.0
}

fn default_near_penalty() -> f64 {
    1.0
}

fn default_far_penalty() -> f64 {
    3.0
}

fn default_humidity_threshold() -> f64 {
    60.0
}

fn default_humidity_penalty() -> f64 {
    0.5
}

fn default_wind_threshold() -> f64 {
    15.0
}

fn default_wind_penalty() -> f64 {
    1.5
}

fn default_precipitation_penalty() -> f64 {
    0.3
}

fn default_max_cities() -> u32 {
    8
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_hours: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ComfortConfig {
    fn default() -> Self {
        Self {
            ideal_low_f: default_ideal_low(),
            ideal_high_f: default_ideal_high(),
            tolerance_f: default_tolerance(),
            near_penalty_per_degree: default_near_penalty(),
            far_penalty_per_degree: default_far_penalty(),
            humidity_threshold: default_humidity_threshold(),
            humidity_penalty_per_point: default_humidity_penalty(),
            wind_threshold_mph: default_wind_threshold(),
            wind_penalty_per_mph: default_wind_penalty(),
            precipitation_penalty_per_point: default_precipitation_penalty(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_cities: default_max_cities(),
            year: None,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from `config_path` (or the user config directory)
    /// and `HOLIDAY_WEATHER_*` environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. HOLIDAY_WEATHER_WEATHER__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("HOLIDAY_WEATHER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PlannerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("holiday-weather").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.defaults.max_cities == 0 {
            self.defaults.max_cities = default_max_cities();
        }
    }

    /// API key from config, falling back to `OPENWEATHER_API_KEY`
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.weather.api_key {
            return Ok(key.clone());
        }
        std::env::var(API_KEY_ENV_VAR).map_err(|_| {
            PlannerError::config(format!(
                "OpenWeather API key not found. Set weather.api_key or {API_KEY_ENV_VAR}."
            ))
            .into()
        })
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.comfort.validate()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.weather.api_key {
            if api_key.is_empty() {
                return Err(PlannerError::config(
                    "Weather API key cannot be empty if provided. Either remove it or provide a valid key."
                ).into());
            }

            if api_key.len() < 8 {
                return Err(PlannerError::config(
                    "Weather API key appears to be invalid (too short). Please check your API key."
                ).into());
            }

            if api_key.len() > 100 {
                return Err(PlannerError::config(
                    "Weather API key appears to be invalid (too long). Please check your API key."
                ).into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(PlannerError::config(
                "Weather API timeout cannot exceed 300 seconds"
            ).into());
        }

        if self.weather.max_retries > 10 {
            return Err(PlannerError::config(
                "Weather API max retries cannot exceed 10"
            ).into());
        }

        if self.cache.ttl_hours > 168 {
            return Err(PlannerError::config(
                "Cache TTL cannot exceed 168 hours (1 week)"
            ).into());
        }

        if self.defaults.max_cities > 30 {
            return Err(PlannerError::config(
                "Maximum cities cannot exceed 30"
            ).into());
        }

        if let Some(year) = self.defaults.year {
            if !crate::window::SUPPORTED_YEARS.contains(&year) {
                return Err(PlannerError::config(format!(
                    "Default year must be between {} and {}",
                    crate::window::SUPPORTED_YEARS.start(),
                    crate::window::SUPPORTED_YEARS.end()
                )).into());
            }
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PlannerError::config(
                format!("Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_log_levels.join(", ")
                )
            ).into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PlannerError::config(
                format!("Invalid log format '{}'. Must be one of: {}",
                    self.logging.format,
                    valid_log_formats.join(", ")
                )
            ).into());
        }

        if !self.weather.base_url.starts_with("http://") && !self.weather.base_url.starts_with("https://") {
            return Err(PlannerError::config(
                "Weather API base URL must be a valid HTTP or HTTPS URL"
            ).into());
        }

        Ok(())
    }
}

impl ComfortConfig {
    /// Reject thresholds that would make scores meaningless
    pub fn validate(&self) -> Result<(), PlannerError> {
        let values = [
            ("ideal_low_f", self.ideal_low_f),
            ("ideal_high_f", self.ideal_high_f),
            ("tolerance_f", self.tolerance_f),
            ("near_penalty_per_degree", self.near_penalty_per_degree),
            ("far_penalty_per_degree", self.far_penalty_per_degree),
            ("humidity_threshold", self.humidity_threshold),
            ("humidity_penalty_per_point", self.humidity_penalty_per_point),
            ("wind_threshold_mph", self.wind_threshold_mph),
            ("wind_penalty_per_mph", self.wind_penalty_per_mph),
            ("precipitation_penalty_per_point", self.precipitation_penalty_per_point),
        ];
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PlannerError::config(format!("comfort.{name} must be a finite number")));
        }

        if self.ideal_low_f >= self.ideal_high_f {
            return Err(PlannerError::config(format!(
                "comfort.ideal_low_f ({}) must be below comfort.ideal_high_f ({})",
                self.ideal_low_f, self.ideal_high_f
            )));
        }

        let non_negative = [
            ("tolerance_f", self.tolerance_f),
            ("near_penalty_per_degree", self.near_penalty_per_degree),
            ("far_penalty_per_degree", self.far_penalty_per_degree),
            ("humidity_penalty_per_point", self.humidity_penalty_per_point),
            ("wind_threshold_mph", self.wind_threshold_mph),
            ("wind_penalty_per_mph", self.wind_penalty_per_mph),
            ("precipitation_penalty_per_point", self.precipitation_penalty_per_point),
        ];
        if let Some((name, value)) = non_negative.iter().find(|(_, v)| *v < 0.0) {
            return Err(PlannerError::config(format!(
                "comfort.{name} cannot be negative, got: {value}"
            )));
        }

        if !(0.0..=100.0).contains(&self.humidity_threshold) {
            return Err(PlannerError::config(format!(
                "comfort.humidity_threshold must be between 0 and 100, got: {}",
                self.humidity_threshold
            )));
        }

        Ok(())
    }
}
