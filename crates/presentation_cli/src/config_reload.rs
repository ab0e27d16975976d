//! Hot-reloadable configuration support
//!
//! SIGHUP re-reads the configuration from the same sources used at startup.
//! A configuration that fails to load or validate is rejected and the
//! previous one stays active.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use infrastructure::{AppConfig, ConfigError};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Where the configuration was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `config.toml` in the working directory, if present
    Default,
    /// Explicit file
    File(PathBuf),
}

impl ConfigSource {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Default, Self::File)
    }

    /// Load and validate a configuration from this source
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let config = match self {
            Self::Default => AppConfig::load()?,
            Self::File(path) => AppConfig::load_from(path)?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// A wrapper around `AppConfig` that supports atomic reload via SIGHUP
#[derive(Debug, Clone)]
pub struct ReloadableConfig {
    inner: Arc<ArcSwap<AppConfig>>,
    source: ConfigSource,
    /// Notifier for config change events
    notify: watch::Sender<u64>,
}

impl ReloadableConfig {
    #[must_use]
    pub fn new(config: AppConfig, source: ConfigSource) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(config))),
            source,
            notify,
        }
    }

    /// Get the current configuration
    #[must_use]
    pub fn load(&self) -> Arc<AppConfig> {
        self.inner.load_full()
    }

    /// Re-read the configuration source
    ///
    /// Returns `true` if a new configuration was accepted
    pub fn reload(&self) -> bool {
        match self.source.load() {
            Ok(new_config) => {
                let old_config = self.inner.swap(Arc::new(new_config));
                info!(
                    old_stops = old_config.stops.len(),
                    new_stops = self.inner.load().stops.len(),
                    "Configuration reloaded successfully"
                );
                self.notify.send_modify(|version| *version += 1);
                true
            },
            Err(e) => {
                error!("Failed to reload configuration: {}", e);
                false
            },
        }
    }

    /// Subscribe to configuration change notifications
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }
}

/// Spawn a background task that listens for SIGHUP and reloads configuration
#[cfg(unix)]
pub fn spawn_config_reload_handler(config: ReloadableConfig) -> ReloadableConfig {
    use tokio::signal::unix::{SignalKind, signal};

    let config_clone = config.clone();
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGHUP handler: {}", e);
                return;
            },
        };

        loop {
            sighup.recv().await;
            info!("📥 Received SIGHUP, reloading configuration...");
            if !config_clone.reload() {
                warn!("⚠️ Configuration reload failed, keeping previous config");
            }
        }
    });

    config
}

/// No-op on non-Unix systems
#[cfg(not(unix))]
pub fn spawn_config_reload_handler(config: ReloadableConfig) -> ReloadableConfig {
    warn!("SIGHUP config reload not supported on this platform");
    config
}
