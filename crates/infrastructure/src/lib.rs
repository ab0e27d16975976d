//! Infrastructure layer - configuration and wiring
//!
//! Loads [`AppConfig`], installs the tracing subscriber and builds the MTD
//! client used by the monitor hub.

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use application::ClientFactory;
use integration_cumtd::{CumtdClient, CumtdConfig, MtdClient};
use secrecy::SecretString;

pub use config::{AppConfig, ApiConfig, ConfigError, LogConfig, MonitorConfig};
pub use telemetry::{TelemetryError, init_tracing};

/// Create an MTD client for a credential
pub fn build_client(config: &CumtdConfig, api_key: SecretString) -> Arc<dyn CumtdClient> {
    Arc::new(MtdClient::new(config, api_key))
}

/// Client factory bound to a fixed client configuration
pub fn client_factory(config: CumtdConfig) -> ClientFactory {
    Arc::new(move |api_key: SecretString| build_client(&config, api_key))
}
