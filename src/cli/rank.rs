//! `rank` subcommand

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use tracing::{debug, info};

use super::choose_window;
use crate::cache::{CachedFetcher, ForecastCache};
use crate::comfort::ComfortScorer;
use crate::config::PlannerConfig;
use crate::planner::{Recommendation, TravelPlanner};
use crate::weather::{OpenWeatherClient, SnapshotFetcher};
use crate::window::TargetWindow;

/// Arguments of the `rank` subcommand.
#[derive(Args, Debug)]
pub struct RankArgs {
    /// State name, case-insensitive.
    #[arg(long)]
    pub state: String,

    /// Year of the Memorial Day weekend.
    #[arg(long)]
    pub year: Option<i32>,

    /// Rank the next N days (1-4) instead of the holiday weekend.
    #[arg(long, conflicts_with = "year")]
    pub next_days: Option<u32>,

    /// Maximum number of cities compared.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Print the ranking as JSON.
    #[arg(long)]
    pub json: bool,

    /// Bypass the forecast cache.
    #[arg(long)]
    pub no_cache: bool,
}

impl RankArgs {
    pub async fn run(&self, config: &PlannerConfig) -> Result<()> {
        let today = Local::now().date_naive();
        let window = choose_window(self.year.or(config.defaults.year), self.next_days, today)?;
        let limit = self
            .limit
            .unwrap_or(config.defaults.max_cities as usize);
        let client = OpenWeatherClient::new(config)?;

        let recommendation = if config.cache.enabled && !self.no_cache {
            let cache = ForecastCache::open(&config.cache.location)?;
            let ttl = Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600);
            debug!("Using forecast cache at {}", config.cache.location);
            self.plan(CachedFetcher::new(client, cache, ttl), config, limit, window, today)
                .await?
        } else {
            self.plan(client, config, limit, window, today).await?
        };

        if self.json {
            let json = serde_json::to_string_pretty(&recommendation)
                .with_context(|| "Failed to serialize ranking")?;
            println!("{json}");
        } else {
            print!("{}", render_table(&recommendation));
        }
        Ok(())
    }

    async fn plan<F: SnapshotFetcher>(
        &self,
        fetcher: F,
        config: &PlannerConfig,
        limit: usize,
        window: TargetWindow,
        today: NaiveDate,
    ) -> Result<Recommendation> {
        let planner = TravelPlanner::new(fetcher, ComfortScorer::new(config.comfort.clone()), limit)
            .with_forecast_date(today);
        let recommendation = planner.plan(&self.state, window).await?;
        if let Some(best) = recommendation.ranking.top() {
            info!("Best destination in {}: {}", recommendation.state, best.city);
        }
        Ok(recommendation)
    }
}

/// Plain-text ranking, one line per city with the factor that cost it the
/// most points and its daily scores
#[must_use]
pub fn render_table(recommendation: &Recommendation) -> String {
    let ranking = &recommendation.ranking;
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", recommendation.state, ranking.window);
    let _ = write!(
        out,
        "{:>3}  {:<20} {:>6}  {:<10} {:<13}",
        "#", "City", "Score", "Label", "Main cost"
    );
    for date in ranking.window.dates() {
        let _ = write!(out, " {:>6}", date.format("%a %-d").to_string());
    }
    out.push('\n');

    for city in &ranking.cities {
        let _ = write!(
            out,
            "{:>3}  {:<20} {:>6.1}  {:<10} {:<13}",
            city.rank,
            city.city,
            city.aggregate_score,
            city.label.as_str(),
            city.penalty_totals().dominant().unwrap_or("-")
        );
        for day in &city.daily_scores {
            let _ = write!(out, " {:>6.1}", day.numeric_score);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CityForecast, WeatherSnapshot};
    use crate::ranking::CityRanker;

    fn recommendation() -> Recommendation {
        let window = TargetWindow::memorial_day_weekend(2025).unwrap();
        let forecasts: Vec<CityForecast> = [("Austin", 0.0), ("Dallas", 50.0)]
            .into_iter()
            .map(|(city, precip)| {
                let snapshots = window
                    .dates()
                    .into_iter()
                    .map(|date| WeatherSnapshot {
                        city: city.to_string(),
                        date,
                        temperature_high: 75.0,
                        temperature_low: 65.0,
                        humidity: 40.0,
                        wind_speed: 5.0,
                        precipitation_probability: precip,
                        condition_text: "clear sky".to_string(),
                    })
                    .collect();
                CityForecast::new(city, snapshots).unwrap()
            })
            .collect();
        let ranking = CityRanker::new(ComfortScorer::default(), window)
            .rank(&forecasts)
            .unwrap();
        Recommendation {
            state: "Texas".to_string(),
            window,
            ranking,
        }
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&recommendation());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Texas: Sat May 24, 2025 to Mon May 26, 2025");
        assert!(lines[1].contains("Sat 24"));
        assert!(lines[1].contains("Mon 26"));
        assert!(lines[1].contains("Main cost"));
        assert!(lines[2].starts_with("  1  Austin"));
        assert!(lines[2].contains("100.0"));
        assert!(lines[2].contains("excellent"));
        assert!(lines[2].contains(" - "));
        assert!(lines[3].starts_with("  2  Dallas"));
        assert!(lines[3].contains("85.0"));
        assert!(lines[3].contains("precipitation"));
    }

    #[test]
    fn test_json_output_shape() {
        let value = serde_json::to_value(recommendation()).unwrap();
        assert_eq!(value["state"], "Texas");
        assert_eq!(value["ranking"]["cities"][0]["city"], "Austin");
        assert_eq!(value["ranking"]["cities"][0]["label"], "excellent");
        assert_eq!(value["window"]["start"], "2025-05-24");
    }
}
