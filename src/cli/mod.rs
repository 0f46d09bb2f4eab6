//! Command line interface

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::catalog;
use crate::config::PlannerConfig;
use crate::window::{FORECAST_HORIZON_DAYS, TargetWindow};

mod current;
mod rank;

pub use current::{CurrentArgs, render_current};
pub use rank::{RankArgs, render_table};

/// Rank the cities of a US state by forecast comfort over Memorial Day weekend
#[derive(Parser, Debug)]
#[command(name = "holiday-weather", version)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to the user config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported states.
    States,
    /// List the candidate cities of a state.
    Cities {
        /// State name, case-insensitive.
        #[arg(long)]
        state: String,
    },
    /// Show the Memorial Day weekend window.
    Window {
        /// Year; defaults to the next weekend that has not ended.
        #[arg(long)]
        year: Option<i32>,
    },
    /// Fetch forecasts and rank a state's cities.
    Rank(RankArgs),
    /// Show current conditions in a state's cities.
    Current(CurrentArgs),
}

impl Cli {
    /// Dispatch the parsed command.
    pub async fn run(self, config: PlannerConfig) -> Result<()> {
        match self.command {
            Command::States => {
                for state in catalog::states() {
                    println!("{state}");
                }
                Ok(())
            }
            Command::Cities { state } => {
                for city in catalog::cities_in_state(&state)? {
                    println!("{city}");
                }
                Ok(())
            }
            Command::Window { year } => {
                let window = resolve_window(year.or(config.defaults.year))?;
                println!("{window}");
                Ok(())
            }
            Command::Rank(args) => args.run(&config).await,
            Command::Current(args) => args.run(&config).await,
        }
    }
}

/// Window for `year`, or the upcoming one when no year is given
fn resolve_window(year: Option<i32>) -> Result<TargetWindow> {
    let window = match year {
        Some(year) => TargetWindow::memorial_day_weekend(year)?,
        None => TargetWindow::upcoming_memorial_day_weekend(Local::now().date_naive())?,
    };
    Ok(window)
}

/// Window to rank on `today`.
///
/// `next_days` wins over everything. An explicit year is taken as is and
/// left to the planner's horizon check. Otherwise the upcoming holiday is
/// used when forecasts reach it, and the next few days when they do not.
pub(crate) fn choose_window(
    year: Option<i32>,
    next_days: Option<u32>,
    today: NaiveDate,
) -> Result<TargetWindow> {
    if let Some(days) = next_days {
        return Ok(TargetWindow::next_days(today, days)?);
    }
    if let Some(year) = year {
        return Ok(TargetWindow::memorial_day_weekend(year)?);
    }

    let holiday = TargetWindow::upcoming_memorial_day_weekend(today)?;
    if holiday.within_horizon(today) {
        return Ok(holiday);
    }
    warn!(
        "{holiday} is beyond the forecast horizon; ranking the next {FORECAST_HORIZON_DAYS} days instead"
    );
    Ok(TargetWindow::next_days(today, FORECAST_HORIZON_DAYS)?)
}
