//! Destination planning for one state
//!
//! Looks up the candidate cities, fetches every forecast concurrently and
//! ranks them once all fetches have finished.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::catalog;
use crate::comfort::ComfortScorer;
use crate::error::PlannerError;
use crate::ranking::{CityRanker, RankedResult};
use crate::weather::{CityQuery, SnapshotFetcher};
use crate::window::TargetWindow;

/// Ranked destinations within one state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub state: String,
    pub window: TargetWindow,
    pub ranking: RankedResult,
}

pub struct TravelPlanner<F> {
    fetcher: F,
    scorer: ComfortScorer,
    max_cities: usize,
    /// Day forecasts are fetched on; enables the horizon check
    forecast_date: Option<NaiveDate>,
}

impl<F: SnapshotFetcher> TravelPlanner<F> {
    pub fn new(fetcher: F, scorer: ComfortScorer, max_cities: usize) -> Self {
        Self {
            fetcher,
            scorer,
            max_cities,
            forecast_date: None,
        }
    }

    /// Reject windows a forecast fetched on `today` cannot cover, before
    /// any request is made
    #[must_use]
    pub fn with_forecast_date(mut self, today: NaiveDate) -> Self {
        self.forecast_date = Some(today);
        self
    }

    /// Rank the candidate cities of `state` over `window`
    #[instrument(skip(self, window), fields(window = %window))]
    pub async fn plan(&self, state: &str, window: TargetWindow) -> Result<Recommendation> {
        if let Some(today) = self.forecast_date
            && !window.within_horizon(today)
        {
            return Err(PlannerError::BeyondForecastHorizon {
                window: window.to_string(),
                last_day: TargetWindow::horizon_end(today),
            }
            .into());
        }

        let cities = catalog::candidate_cities(state, self.max_cities)?;
        // candidate_cities has already rejected unknown states
        let state = catalog::canonical_state(state).unwrap_or(state).to_string();
        let queries: Vec<CityQuery> = cities
            .iter()
            .map(|city| CityQuery::us(*city, state.as_str()))
            .collect();

        info!(
            "Fetching forecasts for {} cities in {}",
            queries.len(),
            state
        );

        let results = join_all(
            queries
                .iter()
                .map(|query| self.fetcher.fetch_forecast(query, &window)),
        )
        .await;

        let mut forecasts = Vec::with_capacity(results.len());
        for (query, result) in queries.iter().zip(results) {
            match result {
                Ok(forecast) => forecasts.push(forecast),
                Err(e) => {
                    warn!("Forecast fetch failed for {}: {e:#}", query.city);
                    return Err(e)
                        .with_context(|| format!("Failed to fetch forecast for {}", query.city));
                }
            }
        }

        let ranking = CityRanker::new(self.scorer.clone(), window).rank(&forecasts)?;

        Ok(Recommendation {
            state,
            window,
            ranking,
        })
    }
}
