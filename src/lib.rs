//! Holiday Weather - ranks the cities of a US state by forecast comfort
//!
//! The core is pure: `ComfortScorer` turns one day's forecast into a 0-100
//! score, `CityRanker` averages those over a `TargetWindow` and orders the
//! cities. Fetching, caching and the CLI sit around it.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod comfort;
pub mod config;
pub mod error;
pub mod models;
pub mod planner;
pub mod ranking;
pub mod weather;
pub mod window;

// Re-export core types for public API
pub use cache::{CachedFetcher, ForecastCache};
pub use cli::{Cli, Command};
pub use comfort::{ComfortLabel, ComfortScore, ComfortScorer, PenaltyBreakdown};
pub use config::{ComfortConfig, LoggingConfig, PlannerConfig};
pub use error::PlannerError;
pub use models::{CityForecast, CurrentConditions, WeatherSnapshot};
pub use planner::{Recommendation, TravelPlanner};
pub use ranking::{CityRanker, RankedCity, RankedResult};
pub use weather::{CityQuery, OpenWeatherClient, SnapshotFetcher};
pub use window::TargetWindow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PlannerError>;
