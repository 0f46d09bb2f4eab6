//! Weather comfort scoring
//!
//! Turns one day's forecast into a 0-100 comfort score using a deduction
//! model: every snapshot starts at 100 and loses points for temperatures
//! away from the ideal band, muggy air, strong wind and rain risk.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ComfortConfig;
use crate::error::PlannerError;
use crate::models::WeatherSnapshot;

/// Highest possible comfort score
pub const MAX_SCORE: f64 = 100.0;

/// Qualitative comfort bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComfortLabel {
    /// score >= 85
    Excellent,
    /// score >= 70
    Good,
    /// score >= 50
    Fair,
    /// score < 50
    Poor,
}

impl ComfortLabel {
    /// Band for a numeric score
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 85.0 => ComfortLabel::Excellent,
            s if s >= 70.0 => ComfortLabel::Good,
            s if s >= 50.0 => ComfortLabel::Fair,
            _ => ComfortLabel::Poor,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ComfortLabel::Excellent => "excellent",
            ComfortLabel::Good => "good",
            ComfortLabel::Fair => "fair",
            ComfortLabel::Poor => "poor",
        }
    }
}

impl fmt::Display for ComfortLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points deducted per factor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    pub temperature: f64,
    pub humidity: f64,
    pub wind: f64,
    pub precipitation: f64,
}

impl PenaltyBreakdown {
    /// Sum of all deductions before clamping
    #[must_use]
    pub fn total(&self) -> f64 {
        self.temperature + self.humidity + self.wind + self.precipitation
    }

    /// Factor that cost the most points, if any cost anything
    #[must_use]
    pub fn dominant(&self) -> Option<&'static str> {
        [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("wind", self.wind),
            ("precipitation", self.precipitation),
        ]
        .into_iter()
        .filter(|(_, points)| *points > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
    }
}

/// Comfort of one city on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortScore {
    pub city: String,
    pub date: NaiveDate,
    /// Score in 0-100
    pub numeric_score: f64,
    pub label: ComfortLabel,
    pub breakdown: PenaltyBreakdown,
}

/// Scores snapshots against a fixed set of comfort thresholds
#[derive(Debug, Clone, Default)]
pub struct ComfortScorer {
    config: ComfortConfig,
}

impl ComfortScorer {
    #[must_use]
    pub fn new(config: ComfortConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ComfortConfig {
        &self.config
    }

    /// Score a snapshot. Out-of-range snapshots are rejected, not clamped.
    pub fn score(&self, snapshot: &WeatherSnapshot) -> Result<ComfortScore, PlannerError> {
        snapshot.validate()?;

        let breakdown = PenaltyBreakdown {
            temperature: self.temperature_penalty(snapshot.average_temperature()),
            humidity: self.humidity_penalty(snapshot.humidity),
            wind: self.wind_penalty(snapshot.wind_speed),
            precipitation: self.precipitation_penalty(snapshot.precipitation_probability),
        };
        let numeric_score = (MAX_SCORE - breakdown.total()).clamp(0.0, MAX_SCORE);

        Ok(ComfortScore {
            city: snapshot.city.clone(),
            date: snapshot.date,
            numeric_score,
            label: ComfortLabel::from_score(numeric_score),
            breakdown,
        })
    }

    /// Degrees the average sits outside the ideal band (0 inside it)
    fn band_distance(&self, average_f: f64) -> f64 {
        if average_f < self.config.ideal_low_f {
            self.config.ideal_low_f - average_f
        } else if average_f > self.config.ideal_high_f {
            average_f - self.config.ideal_high_f
        } else {
            0.0
        }
    }

    /// Piecewise linear: the first `tolerance_f` degrees are cheap, the rest
    /// cost `far_penalty_per_degree` each.
    fn temperature_penalty(&self, average_f: f64) -> f64 {
        let distance = self.band_distance(average_f);
        let near = distance.min(self.config.tolerance_f);
        let far = (distance - self.config.tolerance_f).max(0.0);
        near * self.config.near_penalty_per_degree + far * self.config.far_penalty_per_degree
    }

    fn humidity_penalty(&self, humidity: f64) -> f64 {
        (humidity - self.config.humidity_threshold).max(0.0)
            * self.config.humidity_penalty_per_point
    }

    fn wind_penalty(&self, wind_mph: f64) -> f64 {
        (wind_mph - self.config.wind_threshold_mph).max(0.0) * self.config.wind_penalty_per_mph
    }

    fn precipitation_penalty(&self, probability: f64) -> f64 {
        probability * self.config.precipitation_penalty_per_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn snapshot(high: f64, low: f64, humidity: f64, wind: f64, precip: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            city: "Austin".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 24).unwrap(),
            temperature_high: high,
            temperature_low: low,
            humidity,
            wind_speed: wind,
            precipitation_probability: precip,
            condition_text: "clear sky".to_string(),
        }
    }

    fn scorer() -> ComfortScorer {
        ComfortScorer::default()
    }

    #[test]
    fn test_ideal_day_scores_perfect() {
        let score = scorer().score(&snapshot(75.0, 65.0, 40.0, 5.0, 0.0)).unwrap();
        assert_eq!(score.numeric_score, 100.0);
        assert_eq!(score.label, ComfortLabel::Excellent);
        assert_eq!(score.breakdown, PenaltyBreakdown::default());
        assert_eq!(score.breakdown.dominant(), None);
    }

    #[test]
    fn test_hot_muggy_windy_rainy_day_is_poor() {
        let score = scorer().score(&snapshot(95.0, 85.0, 80.0, 20.0, 60.0)).unwrap();
        assert!(score.numeric_score < 50.0, "got {}", score.numeric_score);
        assert_eq!(score.label, ComfortLabel::Poor);
        assert!((score.numeric_score - 44.5).abs() < 1e-9);
        assert_eq!(score.breakdown.dominant(), Some("temperature"));
    }

    #[test]
    fn test_extreme_day_clamps_to_zero() {
        let score = scorer().score(&snapshot(130.0, 120.0, 100.0, 60.0, 100.0)).unwrap();
        assert_eq!(score.numeric_score, 0.0);
        assert_eq!(score.label, ComfortLabel::Poor);
    }

    #[test]
    fn test_temperature_penalty_is_steeper_far_from_band() {
        let s = scorer();
        // 5 degrees just outside the band vs the next 5 degrees beyond that
        let near = s.temperature_penalty(85.0) - s.temperature_penalty(80.0);
        let far = s.temperature_penalty(90.0) - s.temperature_penalty(85.0);
        assert!(far > near);
        assert_eq!(s.temperature_penalty(72.0), 0.0);
    }

    #[test]
    fn test_monotonic_outside_band() {
        let s = scorer();
        let at = |avg: f64| {
            s.score(&snapshot(avg + 2.0, avg - 2.0, 40.0, 5.0, 0.0))
                .unwrap()
                .numeric_score
        };

        let in_band = at(72.0);
        assert_eq!(in_band, 100.0);
        assert_eq!(at(65.0), in_band);
        assert_eq!(at(80.0), in_band);

        let mut previous = in_band;
        for avg in [81.0, 83.0, 86.0, 90.0, 95.0, 100.0] {
            let current = at(avg);
            assert!(current < previous, "hot side: {avg} gave {current} >= {previous}");
            previous = current;
        }

        let mut previous = in_band;
        for avg in [64.0, 62.0, 59.0, 55.0, 50.0, 45.0] {
            let current = at(avg);
            assert!(current < previous, "cold side: {avg} gave {current} >= {previous}");
            previous = current;
        }
    }

    #[rstest]
    #[case::humidity_at_threshold(snapshot(75.0, 65.0, 60.0, 5.0, 0.0), 100.0)]
    #[case::humidity_above(snapshot(75.0, 65.0, 70.0, 5.0, 0.0), 95.0)]
    #[case::wind_at_threshold(snapshot(75.0, 65.0, 40.0, 15.0, 0.0), 100.0)]
    #[case::wind_above(snapshot(75.0, 65.0, 40.0, 25.0, 0.0), 85.0)]
    #[case::rain_chance(snapshot(75.0, 65.0, 40.0, 5.0, 50.0), 85.0)]
    #[case::cool_evening(snapshot(70.0, 50.0, 40.0, 5.0, 0.0), 95.0)]
    fn test_individual_penalties(#[case] input: WeatherSnapshot, #[case] expected: f64) {
        let score = scorer().score(&input).unwrap();
        assert!(
            (score.numeric_score - expected).abs() < 1e-9,
            "expected {expected}, got {}",
            score.numeric_score
        );
    }

    #[rstest]
    #[case(100.0, ComfortLabel::Excellent)]
    #[case(85.0, ComfortLabel::Excellent)]
    #[case(84.99, ComfortLabel::Good)]
    #[case(70.0, ComfortLabel::Good)]
    #[case(69.9, ComfortLabel::Fair)]
    #[case(50.0, ComfortLabel::Fair)]
    #[case(49.9, ComfortLabel::Poor)]
    #[case(0.0, ComfortLabel::Poor)]
    fn test_label_bands(#[case] score: f64, #[case] expected: ComfortLabel) {
        assert_eq!(ComfortLabel::from_score(score), expected);
    }

    #[test]
    fn test_score_within_bounds_and_label_consistent() {
        let s = scorer();
        for high in [-30.0, 20.0, 60.0, 75.0, 90.0, 120.0] {
            for humidity in [0.0, 55.0, 90.0] {
                for wind in [0.0, 14.0, 40.0] {
                    for precip in [0.0, 35.0, 100.0] {
                        let score = s
                            .score(&snapshot(high, high - 10.0, humidity, wind, precip))
                            .unwrap();
                        assert!((0.0..=100.0).contains(&score.numeric_score));
                        assert_eq!(score.label, ComfortLabel::from_score(score.numeric_score));
                    }
                }
            }
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let s = scorer();
        let input = snapshot(88.0, 71.0, 66.0, 17.0, 20.0);
        assert_eq!(s.score(&input).unwrap(), s.score(&input).unwrap());
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let err = scorer().score(&snapshot(75.0, 65.0, 140.0, 5.0, 0.0)).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_custom_band_moves_the_optimum() {
        let config = ComfortConfig {
            ideal_low_f: 50.0,
            ideal_high_f: 60.0,
            ..ComfortConfig::default()
        };
        let s = ComfortScorer::new(config);
        let cool = s.score(&snapshot(58.0, 52.0, 40.0, 5.0, 0.0)).unwrap();
        let warm = s.score(&snapshot(75.0, 65.0, 40.0, 5.0, 0.0)).unwrap();
        assert_eq!(cool.numeric_score, 100.0);
        assert!(warm.numeric_score < cool.numeric_score);
    }

    #[test]
    fn test_label_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ComfortLabel::Excellent).unwrap(),
            "\"excellent\""
        );
        assert_eq!(ComfortLabel::Fair.to_string(), "fair");
    }
}
