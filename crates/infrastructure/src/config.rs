//! Application configuration
//!
//! Loaded from built-in defaults, an optional TOML file and environment
//! variables (`CUMTD_BUS__API__API_KEY`, `CUMTD_BUS__MONITOR__SCAN_INTERVAL_SECS`, ...),
//! later sources overriding earlier ones.

use std::path::Path;
use std::time::Duration;

use application::{EntryConfig, MonitorSettings};
use domain::{EntryId, StopFilterConfig, validate_targets};
use integration_cumtd::CumtdConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "CUMTD_BUS";

/// Default configuration file name, looked up without extension
pub const DEFAULT_CONFIG_FILE: &str = "config";

/// Largest departure count accepted per request
pub const MAX_DEPARTURE_COUNT: u32 = 50;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Configuration loaded but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Identifier of the configuration entry
    #[serde(default)]
    pub entry_id: EntryId,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Monitored stops, in display order
    #[serde(default)]
    pub stops: Vec<StopFilterConfig>,

    #[serde(default)]
    pub log: LogConfig,
}

/// MTD API access
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API developer key (sensitive)
    #[serde(default = "empty_secret", skip_serializing)]
    pub api_key: SecretString,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn empty_secret() -> SecretString {
    SecretString::from("")
}

fn default_base_url() -> String {
    CumtdConfig::default().base_url
}

fn default_timeout_secs() -> u64 {
    CumtdConfig::default().timeout_secs
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: empty_secret(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Client configuration derived from these settings
    #[must_use]
    pub fn client_config(&self) -> CumtdConfig {
        CumtdConfig {
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    /// Whether a key has been configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }
}

/// Polling behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between refreshes of each target
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Departures requested per refresh
    #[serde(default = "default_departure_count")]
    pub departure_count: u32,
}

const fn default_scan_interval_secs() -> u64 {
    application::DEFAULT_SCAN_INTERVAL.as_secs()
}

const fn default_departure_count() -> u32 {
    application::DEFAULT_DEPARTURE_COUNT
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            departure_count: default_departure_count(),
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    #[must_use]
    pub const fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            scan_interval: self.scan_interval(),
            departure_count: self.departure_count,
        }
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config.toml` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(
            config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
            environment(),
        )
    }

    /// Load configuration from an explicit file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or a source cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(config::File::from(path).required(true), environment())
    }

    fn build<T>(file: T, env: config::Environment) -> Result<Self, ConfigError>
    where
        T: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .set_default("entry_id", EntryId::default().as_str())?
            .set_default("api.base_url", default_base_url())?
            .set_default("api.timeout_secs", default_timeout_secs())?
            .set_default("monitor.scan_interval_secs", default_scan_interval_secs())?
            .set_default("monitor.departure_count", i64::from(default_departure_count()))?
            .add_source(file)
            .add_source(env)
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        debug!(entry = %loaded.entry_id, stops = loaded.stops.len(), "Configuration loaded");
        Ok(loaded)
    }

    /// Check that the configuration can run a monitor
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_api()?;
        if self.monitor.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.scan_interval_secs must be greater than 0".to_string(),
            ));
        }
        if !(1..=MAX_DEPARTURE_COUNT).contains(&self.monitor.departure_count) {
            return Err(ConfigError::Invalid(format!(
                "monitor.departure_count must be between 1 and {MAX_DEPARTURE_COUNT}"
            )));
        }
        validate_targets(&self.stops).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Check only what the one-shot API commands need
    ///
    /// # Errors
    ///
    /// Returns an error for a missing key or an unusable client configuration.
    pub fn validate_api(&self) -> Result<(), ConfigError> {
        if !self.api.has_api_key() {
            return Err(ConfigError::Invalid(format!(
                "api.api_key is required (set {ENV_PREFIX}__API__API_KEY)"
            )));
        }
        self.api
            .client_config()
            .validate()
            .map_err(ConfigError::Invalid)
    }

    /// Entry configuration for the monitor hub
    #[must_use]
    pub fn entry_config(&self) -> EntryConfig {
        EntryConfig::new(
            self.entry_id.clone(),
            self.api.api_key.clone(),
            self.stops.clone(),
        )
        .with_settings(self.monitor.settings())
    }

    /// Minimal valid configuration for tests
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api: ApiConfig {
                api_key: SecretString::from("test-key"),
                base_url: base_url.to_string(),
                timeout_secs: 5,
            },
            stops: vec![StopFilterConfig::new("IT", "Illinois Terminal")],
            ..Self::default()
        }
    }
}

/// Environment overrides, e.g. `CUMTD_BUS__API__API_KEY`
///
/// Values stay strings; numeric fields are coerced on deserialization so
/// that numeric-looking keys keep their leading zeros.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}
