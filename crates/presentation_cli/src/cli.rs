//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MTD next-bus monitor
#[derive(Debug, Parser)]
#[command(name = "cumtd-bus")]
#[command(author, version, about = "Champaign-Urbana MTD next-bus monitor", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./config.toml if present)
    #[arg(short, long, global = true, env = "CUMTD_BUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the configured API key is accepted
    ValidateKey,

    /// Search stops by name (case-insensitive substring)
    SearchStops {
        /// Text to look for in stop names
        query: String,
    },

    /// List the routes serving a stop
    Routes {
        /// Stop identifier, e.g. IT
        stop_id: String,
    },

    /// Show upcoming departures and the one a sensor would report
    ///
    /// Example: cumtd-bus departures IT --route GREEN --direction east
    Departures {
        /// Stop identifier, e.g. IT
        stop_id: String,

        /// Only departures of this route (filtered by the API)
        #[arg(short, long)]
        route: Option<String>,

        /// Number of departures to request
        #[arg(short = 'n', long, default_value_t = application::DEFAULT_DEPARTURE_COUNT)]
        count: u32,

        /// Direction to select the next departure for (case-insensitive)
        #[arg(short, long)]
        direction: Option<String>,
    },

    /// Monitor the configured stops until interrupted
    ///
    /// Prints one JSON line per sensor on every refresh. Send SIGHUP to
    /// reload the configuration file.
    Watch,
}

/// Log filter for the verbosity count; `None` defers to the configured level
pub const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}
