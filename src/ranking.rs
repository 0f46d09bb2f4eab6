//! City ranking over a target window
//!
//! Every city is reduced to the mean comfort score of the window's days and
//! cities are ordered best first. Equal scores fall back to the city name so
//! the order never depends on input order.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::comfort::{ComfortLabel, ComfortScore, ComfortScorer, PenaltyBreakdown};
use crate::error::PlannerError;
use crate::models::CityForecast;
use crate::window::TargetWindow;

/// One city's position in the ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCity {
    /// 1-based position
    pub rank: usize,
    pub city: String,
    /// Mean comfort score across the window
    pub aggregate_score: f64,
    /// Band of the aggregate score
    pub label: ComfortLabel,
    /// Per-day scores, in date order
    pub daily_scores: Vec<ComfortScore>,
}

impl RankedCity {
    /// Penalties summed over every day of the window
    #[must_use]
    pub fn penalty_totals(&self) -> PenaltyBreakdown {
        self.daily_scores
            .iter()
            .fold(PenaltyBreakdown::default(), |acc, day| PenaltyBreakdown {
                temperature: acc.temperature + day.breakdown.temperature,
                humidity: acc.humidity + day.breakdown.humidity,
                wind: acc.wind + day.breakdown.wind,
                precipitation: acc.precipitation + day.breakdown.precipitation,
            })
    }
}

/// Cities ordered by aggregate comfort, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub window: TargetWindow,
    pub cities: Vec<RankedCity>,
}

impl RankedResult {
    /// Best city
    #[must_use]
    pub fn top(&self) -> Option<&RankedCity> {
        self.cities.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// City names in ranked order
    #[must_use]
    pub fn order(&self) -> Vec<&str> {
        self.cities.iter().map(|c| c.city.as_str()).collect()
    }
}

/// Scores and orders city forecasts over one window
#[derive(Debug, Clone)]
pub struct CityRanker {
    scorer: ComfortScorer,
    window: TargetWindow,
}

impl CityRanker {
    #[must_use]
    pub fn new(scorer: ComfortScorer, window: TargetWindow) -> Self {
        Self { scorer, window }
    }

    #[must_use]
    pub fn window(&self) -> &TargetWindow {
        &self.window
    }

    /// Rank all forecasts. Any bad city fails the whole call; a partial
    /// ranking is never returned.
    pub fn rank(&self, forecasts: &[CityForecast]) -> Result<RankedResult, PlannerError> {
        if forecasts.is_empty() {
            return Err(PlannerError::EmptyInput);
        }

        let mut seen = HashSet::with_capacity(forecasts.len());
        for forecast in forecasts {
            if !seen.insert(forecast.city().to_lowercase()) {
                return Err(PlannerError::DuplicateCity {
                    city: forecast.city().to_string(),
                });
            }
        }

        let mut cities = forecasts
            .iter()
            .map(|forecast| self.aggregate(forecast))
            .collect::<Result<Vec<_>, _>>()?;

        cities.sort_by(compare_ranked);
        for (idx, city) in cities.iter_mut().enumerate() {
            city.rank = idx + 1;
        }

        if let Some(best) = cities.first() {
            info!(
                "Ranked {} cities for {}; best is {} ({:.1})",
                cities.len(),
                self.window,
                best.city,
                best.aggregate_score
            );
        }

        Ok(RankedResult {
            window: self.window,
            cities,
        })
    }

    /// Mean comfort of one city over the window (rank left at 0)
    pub fn aggregate(&self, forecast: &CityForecast) -> Result<RankedCity, PlannerError> {
        if forecast.is_empty() {
            return Err(PlannerError::incomplete_forecast(
                forecast.city(),
                "forecast has no snapshots",
            ));
        }

        let missing = forecast.missing_dates(&self.window);
        if !missing.is_empty() {
            let missing = missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PlannerError::incomplete_forecast(
                forecast.city(),
                format!("missing {missing} within {}", self.window),
            ));
        }

        let daily_scores = forecast
            .within(&self.window)
            .map(|snapshot| self.scorer.score(snapshot))
            .collect::<Result<Vec<_>, _>>()?;

        #[allow(clippy::cast_precision_loss)]
        let aggregate_score =
            daily_scores.iter().map(|s| s.numeric_score).sum::<f64>() / daily_scores.len() as f64;

        debug!(
            "{}: {:.1} over {} days",
            forecast.city(),
            aggregate_score,
            daily_scores.len()
        );

        Ok(RankedCity {
            rank: 0,
            city: forecast.city().to_string(),
            aggregate_score,
            label: ComfortLabel::from_score(aggregate_score),
            daily_scores,
        })
    }
}

/// Higher score first, then city name ascending
fn compare_ranked(a: &RankedCity, b: &RankedCity) -> Ordering {
    b.aggregate_score
        .total_cmp(&a.aggregate_score)
        .then_with(|| a.city.cmp(&b.city))
}
