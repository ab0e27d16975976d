//! Monitor hub: lifecycle of all targets of one configuration entry
//!
//! A [`MonitorHub`] owns one shared client and one [`RefreshCoordinator`] plus
//! background task per target. It is created by [`MonitorHub::setup`], updated
//! in place by [`MonitorHub::reload`] and torn down by
//! [`MonitorHub::shutdown`]. [`MonitorRegistry`] keeps the hubs of all loaded
//! entries, keyed by entry id.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use domain::{EntryId, StopFilterConfig, TargetKey, validate_targets};
use futures::future::join_all;
use integration_cumtd::CumtdClient;
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::coordinator::{DEFAULT_DEPARTURE_COUNT, DEFAULT_SCAN_INTERVAL, RefreshCoordinator};
use crate::error::ApplicationError;
use crate::sensor::NextBusSensor;

/// Builds a client for a credential
pub type ClientFactory = Arc<dyn Fn(SecretString) -> Arc<dyn CumtdClient> + Send + Sync>;

/// Polling settings shared by all targets of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Time between refreshes of each target
    pub scan_interval: Duration,
    /// Departures requested per refresh
    pub departure_count: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            departure_count: DEFAULT_DEPARTURE_COUNT,
        }
    }
}

/// Everything needed to run one configuration entry
#[derive(Debug, Clone)]
pub struct EntryConfig {
    /// Entry this configuration belongs to
    pub entry_id: EntryId,
    /// MTD developer API key
    pub api_key: SecretString,
    /// Targets in display order
    pub targets: Vec<StopFilterConfig>,
    /// Polling settings
    pub settings: MonitorSettings,
}

impl EntryConfig {
    /// Entry with default polling settings
    pub fn new(
        entry_id: EntryId,
        api_key: SecretString,
        targets: Vec<StopFilterConfig>,
    ) -> Self {
        Self {
            entry_id,
            api_key,
            targets,
            settings: MonitorSettings::default(),
        }
    }

    /// Override the polling settings
    #[must_use]
    pub const fn with_settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    fn same_credential(&self, other: &Self) -> bool {
        self.api_key.expose_secret() == other.api_key.expose_secret()
    }
}

/// What a reload changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Targets that kept their coordinator and state
    pub kept: usize,
    /// Targets whose key survived but were recreated
    pub rebuilt: usize,
    /// Targets with a new key
    pub added: usize,
    /// Targets whose key vanished
    pub removed: usize,
    /// Whether a new client was built for a new key
    pub credential_changed: bool,
}

struct RunningTarget {
    coordinator: Arc<RefreshCoordinator>,
    task: JoinHandle<()>,
}

/// Running monitor for one configuration entry
pub struct MonitorHub {
    config: EntryConfig,
    factory: ClientFactory,
    client: Arc<dyn CumtdClient>,
    targets: Vec<RunningTarget>,
}

impl fmt::Debug for MonitorHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHub")
            .field("entry_id", &self.config.entry_id)
            .field("targets", &self.keys())
            .field("settings", &self.config.settings)
            .finish_non_exhaustive()
    }
}

impl MonitorHub {
    /// Start monitoring an entry
    ///
    /// Every target performs its first refresh before any periodic task is
    /// spawned. If one of them fails, the client is closed and the entry does
    /// not start.
    ///
    /// # Errors
    ///
    /// Returns a validation error for invalid or duplicated targets, or
    /// `SetupFailed` for the first target whose initial refresh failed.
    #[instrument(skip(config, factory), fields(entry = %config.entry_id, targets = config.targets.len()))]
    pub async fn setup(config: EntryConfig, factory: ClientFactory) -> Result<Self, ApplicationError> {
        validate_targets(&config.targets)?;

        let client = factory(config.api_key.clone());
        let coordinators = build_coordinators(&client, &config.targets, config.settings);

        if let Err(e) = first_refresh_all(&coordinators).await {
            warn!(error = %e, "Entry setup failed");
            client.close().await;
            return Err(e);
        }

        let targets = coordinators
            .into_iter()
            .map(|coordinator| start(coordinator, config.settings.scan_interval))
            .collect();

        info!("Entry set up");
        Ok(Self {
            config,
            factory,
            client,
            targets,
        })
    }

    /// Apply a new configuration to the running entry
    ///
    /// Unchanged targets keep running with their state. New and changed
    /// targets refresh once before anything is committed, so a failed reload
    /// leaves the hub exactly as it was. A changed credential is validated
    /// first and, when accepted, all targets move to a new client; the old
    /// client is closed after the swap.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `InvalidCredential`/`Client` when the new
    /// credential cannot be validated, or `SetupFailed` from a new target.
    #[instrument(skip(self, config), fields(entry = %self.config.entry_id))]
    pub async fn reload(&mut self, config: EntryConfig) -> Result<ReloadSummary, ApplicationError> {
        if config.entry_id != self.config.entry_id {
            return Err(domain::DomainError::ValidationError(format!(
                "cannot reload entry {} with configuration for {}",
                self.config.entry_id, config.entry_id
            ))
            .into());
        }
        validate_targets(&config.targets)?;

        let credential_changed = !config.same_credential(&self.config);
        let client = if credential_changed {
            self.validated_client(&config.api_key).await?
        } else {
            Arc::clone(&self.client)
        };

        let count_changed = config.settings.departure_count != self.config.settings.departure_count;
        let interval_changed = config.settings.scan_interval != self.config.settings.scan_interval;
        let reuse_allowed = !credential_changed && !count_changed;

        let mut summary = ReloadSummary {
            credential_changed,
            ..ReloadSummary::default()
        };

        // Each new target either keeps a running one or gets a fresh coordinator.
        let mut plan = Vec::with_capacity(config.targets.len());
        let mut fresh = Vec::new();
        for target in &config.targets {
            let existing = self
                .targets
                .iter()
                .position(|running| running.coordinator.key() == &target.target_key());

            match existing {
                Some(index)
                    if reuse_allowed && self.targets[index].coordinator.target() == target =>
                {
                    summary.kept += 1;
                    plan.push(Planned::Keep(index));
                },
                Some(_) => {
                    summary.rebuilt += 1;
                    plan.push(Planned::Fresh);
                    fresh.push(new_coordinator(&client, target, config.settings));
                },
                None => {
                    summary.added += 1;
                    plan.push(Planned::Fresh);
                    fresh.push(new_coordinator(&client, target, config.settings));
                },
            }
        }

        let new_keys: HashSet<TargetKey> = config.targets.iter().map(StopFilterConfig::target_key).collect();
        summary.removed = self
            .targets
            .iter()
            .filter(|running| !new_keys.contains(running.coordinator.key()))
            .count();

        if let Err(e) = first_refresh_all(&fresh).await {
            warn!(error = %e, "Reload rejected, keeping previous targets");
            if credential_changed {
                client.close().await;
            }
            return Err(e);
        }

        // Commit.
        let mut previous: Vec<Option<RunningTarget>> =
            std::mem::take(&mut self.targets).into_iter().map(Some).collect();
        let kept: Vec<Option<RunningTarget>> = plan
            .iter()
            .map(|step| match step {
                Planned::Keep(index) => previous[*index].take(),
                Planned::Fresh => None,
            })
            .collect();
        stop_all(previous.into_iter().flatten()).await;

        let period = config.settings.scan_interval;
        let mut fresh = fresh.into_iter();
        let mut targets = Vec::with_capacity(plan.len());
        for (step, kept) in plan.into_iter().zip(kept) {
            match step {
                Planned::Keep(_) => {
                    if let Some(running) = kept {
                        let running = if interval_changed {
                            restart(running, period).await
                        } else {
                            running
                        };
                        targets.push(running);
                    }
                },
                Planned::Fresh => {
                    if let Some(coordinator) = fresh.next() {
                        targets.push(start(coordinator, period));
                    }
                },
            }
        }
        self.targets = targets;

        if credential_changed {
            let old = std::mem::replace(&mut self.client, client);
            old.close().await;
        }
        self.config = config;

        info!(
            kept = summary.kept,
            rebuilt = summary.rebuilt,
            added = summary.added,
            removed = summary.removed,
            credential_changed,
            "Entry reloaded"
        );
        Ok(summary)
    }

    async fn validated_client(
        &self,
        api_key: &SecretString,
    ) -> Result<Arc<dyn CumtdClient>, ApplicationError> {
        let client = (self.factory)(api_key.clone());
        let outcome = match client.validate_credential().await {
            Ok(true) => return Ok(client),
            Ok(false) => ApplicationError::InvalidCredential("API key rejected".to_string()),
            Err(e) if e.is_authentication() => ApplicationError::InvalidCredential(e.to_string()),
            Err(e) => ApplicationError::Client(e),
        };
        client.close().await;
        Err(outcome)
    }

    /// Stop every task and close the client
    #[instrument(skip(self), fields(entry = %self.config.entry_id))]
    pub async fn shutdown(mut self) {
        stop_all(std::mem::take(&mut self.targets)).await;
        self.client.close().await;
        info!("Entry unloaded");
    }

    /// Id of the entry this hub runs
    pub const fn entry_id(&self) -> &EntryId {
        &self.config.entry_id
    }

    /// Configuration currently applied
    pub const fn config(&self) -> &EntryConfig {
        &self.config
    }

    /// Shared client of this entry
    pub fn client(&self) -> Arc<dyn CumtdClient> {
        Arc::clone(&self.client)
    }

    /// Coordinators in configuration order
    pub fn coordinators(&self) -> impl Iterator<Item = &Arc<RefreshCoordinator>> {
        self.targets.iter().map(|running| &running.coordinator)
    }

    /// Coordinator of one target
    pub fn coordinator(&self, key: &TargetKey) -> Option<&Arc<RefreshCoordinator>> {
        self.coordinators().find(|c| c.key() == key)
    }

    /// Target keys in configuration order
    pub fn keys(&self) -> Vec<TargetKey> {
        self.coordinators().map(|c| c.key().clone()).collect()
    }

    /// One sensor per target, in configuration order
    pub fn sensors(&self) -> Vec<NextBusSensor> {
        self.coordinators()
            .map(|c| {
                NextBusSensor::new(
                    self.config.entry_id.clone(),
                    c.target().clone(),
                    c.subscribe(),
                )
            })
            .collect()
    }

    /// Number of running targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Drop for MonitorHub {
    fn drop(&mut self) {
        for running in &self.targets {
            running.task.abort();
        }
    }
}

enum Planned {
    Keep(usize),
    Fresh,
}

fn new_coordinator(
    client: &Arc<dyn CumtdClient>,
    target: &StopFilterConfig,
    settings: MonitorSettings,
) -> Arc<RefreshCoordinator> {
    Arc::new(
        RefreshCoordinator::new(Arc::clone(client), target.clone())
            .with_departure_count(settings.departure_count),
    )
}

fn build_coordinators(
    client: &Arc<dyn CumtdClient>,
    targets: &[StopFilterConfig],
    settings: MonitorSettings,
) -> Vec<Arc<RefreshCoordinator>> {
    targets
        .iter()
        .map(|target| new_coordinator(client, target, settings))
        .collect()
}

async fn first_refresh_all(coordinators: &[Arc<RefreshCoordinator>]) -> Result<(), ApplicationError> {
    let results = join_all(coordinators.iter().map(|c| c.first_refresh())).await;
    results.into_iter().collect()
}

fn start(coordinator: Arc<RefreshCoordinator>, period: Duration) -> RunningTarget {
    let task = Arc::clone(&coordinator).spawn(period);
    RunningTarget { coordinator, task }
}

async fn restart(running: RunningTarget, period: Duration) -> RunningTarget {
    running.task.abort();
    let _ = running.task.await;
    start(running.coordinator, period)
}

async fn stop_all(targets: impl IntoIterator<Item = RunningTarget>) {
    let tasks: Vec<_> = targets
        .into_iter()
        .map(|running| {
            debug!(key = %running.coordinator.key(), "Stopping refresh task");
            running.task.abort();
            running.task
        })
        .collect();
    // Cancelled tasks resolve with a JoinError.
    let _ = join_all(tasks).await;
}

/// Loaded entries, keyed by entry id
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    hubs: HashMap<EntryId, MonitorHub>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a started hub
    ///
    /// # Errors
    ///
    /// Returns `EntryAlreadyLoaded` if the id is taken; the hub is shut down.
    pub async fn insert(&mut self, hub: MonitorHub) -> Result<(), ApplicationError> {
        if self.hubs.contains_key(hub.entry_id()) {
            let id = hub.entry_id().clone();
            hub.shutdown().await;
            return Err(ApplicationError::EntryAlreadyLoaded(id));
        }
        self.hubs.insert(hub.entry_id().clone(), hub);
        Ok(())
    }

    /// Hub of a loaded entry
    pub fn get(&self, id: &EntryId) -> Option<&MonitorHub> {
        self.hubs.get(id)
    }

    pub fn get_mut(&mut self, id: &EntryId) -> Option<&mut MonitorHub> {
        self.hubs.get_mut(id)
    }

    /// Remove a hub without stopping it
    pub fn remove(&mut self, id: &EntryId) -> Option<MonitorHub> {
        self.hubs.remove(id)
    }

    /// Stop and remove one entry
    ///
    /// # Errors
    ///
    /// Returns `EntryNotLoaded` for an unknown id.
    pub async fn unload(&mut self, id: &EntryId) -> Result<(), ApplicationError> {
        let hub = self
            .hubs
            .remove(id)
            .ok_or_else(|| ApplicationError::EntryNotLoaded(id.clone()))?;
        hub.shutdown().await;
        Ok(())
    }

    /// Stop every entry
    pub async fn shutdown_all(&mut self) {
        let hubs: Vec<_> = self.hubs.drain().map(|(_, hub)| hub).collect();
        join_all(hubs.into_iter().map(MonitorHub::shutdown)).await;
    }

    /// Loaded entry ids, sorted
    pub fn entry_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<_> = self.hubs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}
