//! Per-city forecast collection and its invariants

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::WeatherSnapshot;
use crate::error::PlannerError;
use crate::window::TargetWindow;

/// Snapshots for a single city, one per date, sorted by date
#[derive(Debug, Clone, Serialize)]
pub struct CityForecast {
    city: String,
    snapshots: Vec<WeatherSnapshot>,
}

impl CityForecast {
    /// Build a forecast, checking that every snapshot belongs to `city`
    /// and that no date appears twice
    pub fn new<S: Into<String>>(
        city: S,
        mut snapshots: Vec<WeatherSnapshot>,
    ) -> Result<Self, PlannerError> {
        let city = city.into();
        if city.trim().is_empty() {
            return Err(PlannerError::validation("City name cannot be empty"));
        }

        let mut seen = HashSet::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            if snapshot.city != city {
                return Err(PlannerError::validation(format!(
                    "Snapshot for '{}' on {} does not belong to forecast for '{}'",
                    snapshot.city, snapshot.date, city
                )));
            }
            if !seen.insert(snapshot.date) {
                return Err(PlannerError::validation(format!(
                    "Duplicate snapshot for '{}' on {}",
                    city, snapshot.date
                )));
            }
        }

        snapshots.sort_by_key(|s| s.date);
        Ok(Self { city, snapshots })
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn snapshots(&self) -> &[WeatherSnapshot] {
        &self.snapshots
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Snapshot for a given day, if present
    #[must_use]
    pub fn snapshot_for(&self, date: NaiveDate) -> Option<&WeatherSnapshot> {
        self.snapshots
            .binary_search_by_key(&date, |s| s.date)
            .ok()
            .map(|idx| &self.snapshots[idx])
    }

    /// Days of `window` this forecast has no snapshot for
    #[must_use]
    pub fn missing_dates(&self, window: &TargetWindow) -> Vec<NaiveDate> {
        window
            .dates()
            .into_iter()
            .filter(|date| self.snapshot_for(*date).is_none())
            .collect()
    }

    /// Snapshots that fall inside `window`, in date order
    pub fn within<'a>(
        &'a self,
        window: &'a TargetWindow,
    ) -> impl Iterator<Item = &'a WeatherSnapshot> + 'a {
        self.snapshots.iter().filter(move |s| window.contains(s.date))
    }

    /// Consume the forecast, returning its snapshots
    #[must_use]
    pub fn into_snapshots(self) -> Vec<WeatherSnapshot> {
        self.snapshots
    }
}
