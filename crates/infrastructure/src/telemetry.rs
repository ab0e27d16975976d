//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Error type for telemetry initialization
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed or the filter is invalid
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `filter`. With `config.json` set, events
/// are written as JSON lines; otherwise in the compact human-readable format.
pub fn init_tracing(config: &LogConfig, filter: Option<&str>) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or(config.level.as_str())))
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()
    };

    result.map_err(|e| TelemetryError::Init(e.to_string()))
}
