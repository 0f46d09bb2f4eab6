use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use holiday_weather::{Cli, LoggingConfig, PlannerConfig, PlannerError};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Logs go to stderr so `rank --json` output stays parseable
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("holiday_weather={default_level},warn").into());

    let json = logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Friendly message for known failures, full chain for the rest
fn report(err: &anyhow::Error) {
    match err
        .chain()
        .find_map(|cause| cause.downcast_ref::<PlannerError>())
    {
        Some(planner_err) => {
            eprintln!("Error: {}", planner_err.user_message());
            eprintln!("Details: {err:#}");
        }
        None => eprintln!("Error: {err:#}"),
    }
    debug!("{err:?}");
}

async fn run(cli: Cli) -> Result<()> {
    let config = PlannerConfig::load_from_path(cli.config.clone())?;
    init_tracing(&config.logging, cli.verbose);
    debug!("Configuration loaded");

    cli.run(config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
