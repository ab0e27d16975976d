//! cumtd-bus CLI
//!
//! Queries the Champaign-Urbana MTD API and runs the next-bus monitor.

#![allow(clippy::print_stdout)]

mod cli;
mod commands;
mod config_reload;
mod watch;

use clap::Parser;
use infrastructure::{AppConfig, build_client, init_tracing};

use crate::cli::{Cli, Commands, log_filter_from_verbosity};
use crate::config_reload::ConfigSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let source = ConfigSource::from_arg(cli.config);
    let config = match &source {
        ConfigSource::Default => AppConfig::load()?,
        ConfigSource::File(path) => AppConfig::load_from(path)?,
    };

    init_tracing(&config.log, log_filter_from_verbosity(cli.verbose))?;

    if matches!(cli.command, Commands::Watch) {
        return watch::run(config, source).await;
    }

    config.validate_api()?;
    let client = build_client(&config.api.client_config(), config.api.api_key.clone());

    let result = match cli.command {
        Commands::ValidateKey => commands::validate_key(client.as_ref()).await,
        Commands::SearchStops { query } => commands::search_stops(client.as_ref(), &query).await,
        Commands::Routes { stop_id } => commands::routes(client.as_ref(), &stop_id).await,
        Commands::Departures {
            stop_id,
            route,
            count,
            direction,
        } => {
            commands::departures(
                client.as_ref(),
                &stop_id,
                route.as_deref(),
                count,
                direction.as_deref(),
            )
            .await
        },
        Commands::Watch => Ok(()),
    };

    client.close().await;
    result
}
