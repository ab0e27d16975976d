//! Long-running monitor
//!
//! Runs one [`MonitorHub`] for the configured entry, prints every sensor as a
//! JSON line whenever its coordinator publishes, applies SIGHUP reloads and
//! stops on Ctrl+C or SIGTERM.

use application::{MonitorHub, NextBusSensor};
use infrastructure::{AppConfig, client_factory};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config_reload::{ConfigSource, ReloadableConfig, spawn_config_reload_handler};

pub async fn run(config: AppConfig, source: ConfigSource) -> anyhow::Result<()> {
    config.validate()?;

    let client_config = config.api.client_config();
    let mut hub = MonitorHub::setup(config.entry_config(), client_factory(client_config.clone())).await?;
    info!(entry = %hub.entry_id(), targets = hub.len(), "🚌 Monitoring started");

    let mut printers = spawn_printers(&hub);

    let reloadable = spawn_config_reload_handler(ReloadableConfig::new(config, source));
    let mut reloads = reloadable.subscribe();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = reloads.changed() => {
                if changed.is_err() {
                    break;
                }
                let config = reloadable.load();
                if config.api.client_config() != client_config {
                    warn!("API base URL or timeout changed; restart to apply");
                }
                match hub.reload(config.entry_config()).await {
                    Ok(summary) => {
                        info!(?summary, "✅ Configuration applied");
                        printers.abort_all();
                        printers = spawn_printers(&hub);
                    },
                    Err(e) => error!("Failed to apply configuration, keeping previous targets: {}", e),
                }
            }
        }
    }

    printers.abort_all();
    hub.shutdown().await;
    info!("👋 Monitoring stopped");
    Ok(())
}

/// One printing task per sensor; each prints the current state first
fn spawn_printers(hub: &MonitorHub) -> JoinSet<()> {
    let mut printers = JoinSet::new();
    for sensor in hub.sensors() {
        printers.spawn(print_updates(sensor));
    }
    printers
}

async fn print_updates(mut sensor: NextBusSensor) {
    loop {
        match serde_json::to_string(&sensor.snapshot()) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(sensor = %sensor.unique_id(), "Failed to serialize sensor: {}", e),
        }
        if !sensor.changed().await {
            break;
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("📥 Received Ctrl+C, shutting down...");
        }
        () = terminate => {
            info!("📥 Received SIGTERM, shutting down...");
        }
    }
}
