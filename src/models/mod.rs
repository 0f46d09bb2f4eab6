//! Data models for the holiday weather planner
//!
//! This module contains the core domain models organized by concern:
//! - Snapshot: one day of forecast weather for one city
//! - Forecast: the per-city collection of snapshots
//! - Current: observed conditions right now

pub mod current;
pub mod forecast;
pub mod snapshot;

// Re-export all public types for convenient access
pub use current::CurrentConditions;
pub use forecast::CityForecast;
pub use snapshot::WeatherSnapshot;
