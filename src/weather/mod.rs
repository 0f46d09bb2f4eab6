//! Weather snapshot fetching
//!
//! The ranking core only needs `CityForecast` values; this module defines the
//! seam through which they are obtained and the OpenWeather implementation.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::CityForecast;
use crate::window::TargetWindow;

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// A city to fetch a forecast for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityQuery {
    pub city: String,
    pub state: String,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
}

impl CityQuery {
    /// A US city
    pub fn us<C: Into<String>, S: Into<String>>(city: C, state: S) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            country: "US".to_string(),
        }
    }

    /// Provider search string, e.g. "Austin,Texas,US"
    #[must_use]
    pub fn search_term(&self) -> String {
        format!("{},{},{}", self.city, self.state, self.country)
    }

    /// Generate cache key for this city's forecast over `window`
    #[must_use]
    pub fn cache_key(&self, window: &TargetWindow) -> String {
        format!(
            "forecast:{}:{}:{}:{}:{}",
            self.country,
            self.state,
            self.city,
            window.start(),
            window.end()
        )
        .to_lowercase()
    }
}

/// Source of per-day forecast snapshots
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Forecast for `query`, restricted to the days of `window` the provider
    /// covers. Missing days are left missing; the ranker decides what that
    /// means.
    async fn fetch_forecast(&self, query: &CityQuery, window: &TargetWindow)
    -> Result<CityForecast>;
}
