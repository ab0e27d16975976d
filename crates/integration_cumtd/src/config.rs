//! MTD client configuration

use serde::{Deserialize, Serialize};

/// Configuration for the MTD developer API client
///
/// The credential is not part of this struct; it is handed to
/// [`MtdClient::new`](crate::MtdClient::new) separately so it never ends up
/// in serialized configuration dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumtdConfig {
    /// Base URL for the JSON API (without trailing slash)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://developer.cumtd.com/api/v2.2/json".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for CumtdConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CumtdConfig {
    /// Create a configuration pointing at a custom base URL (e.g. a mock server)
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Build the full URL for an API method
    #[must_use]
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.trim_end_matches('/'))
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
