//! Per-target refresh coordinator
//!
//! Each monitored target owns one [`RefreshCoordinator`]. On every tick it
//! fetches departures for the stop (route filter passed to the server),
//! selects the next departure locally and publishes the result through a
//! `watch` channel. A failed tick keeps the previous departure and only flips
//! the success flag, so consumers see "stale but last known" instead of a gap.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::{StopFilterConfig, TargetKey};
use integration_cumtd::{CumtdClient, CumtdError, Departure};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::selector::select_next_departure;

/// Default refresh period per target
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(15);

/// Default number of departures requested per refresh
pub const DEFAULT_DEPARTURE_COUNT: u32 = 5;

/// Observable refresh status of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// No refresh has completed yet
    Idle,
    /// Last refresh succeeded
    Fresh,
    /// Last refresh failed; previous data retained
    Stale,
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fresh => write!(f, "fresh"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// Current data of one target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshState {
    /// Departure selected by the last successful refresh
    pub last_data: Option<Departure>,
    /// Whether the last completed refresh succeeded
    pub last_success: bool,
    /// When the last refresh completed, successful or not
    pub last_update: Option<DateTime<Utc>>,
    /// Error of the last refresh, cleared on success
    pub last_error: Option<String>,
}

impl RefreshState {
    /// Derived status
    pub fn status(&self) -> RefreshStatus {
        match (self.last_update, self.last_success) {
            (None, _) => RefreshStatus::Idle,
            (Some(_), true) => RefreshStatus::Fresh,
            (Some(_), false) => RefreshStatus::Stale,
        }
    }

    fn record_success(&mut self, data: Option<Departure>) {
        self.last_data = data;
        self.last_success = true;
        self.last_update = Some(Utc::now());
        self.last_error = None;
    }

    fn record_failure(&mut self, error: &CumtdError) {
        self.last_success = false;
        self.last_update = Some(Utc::now());
        self.last_error = Some(error.to_string());
    }
}

/// Drives the fetch-and-select cycle for one target
pub struct RefreshCoordinator {
    client: Arc<dyn CumtdClient>,
    target: StopFilterConfig,
    key: TargetKey,
    departure_count: u32,
    state: watch::Sender<RefreshState>,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("key", &self.key)
            .field("departure_count", &self.departure_count)
            .field("status", &self.state.borrow().status())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Create a coordinator in the `Idle` state
    pub fn new(client: Arc<dyn CumtdClient>, target: StopFilterConfig) -> Self {
        let key = target.target_key();
        let (state, _) = watch::channel(RefreshState::default());
        Self {
            client,
            target,
            key,
            departure_count: DEFAULT_DEPARTURE_COUNT,
            state,
        }
    }

    /// Override the number of departures requested per refresh
    #[must_use]
    pub fn with_departure_count(mut self, count: u32) -> Self {
        self.departure_count = count;
        self
    }

    /// Target configuration
    pub fn target(&self) -> &StopFilterConfig {
        &self.target
    }

    /// Target identity key
    pub fn key(&self) -> &TargetKey {
        &self.key
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every completed refresh
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    async fn fetch(&self) -> Result<Option<Departure>, CumtdError> {
        debug!(
            route = self.key.route(),
            direction = self.key.direction(),
            "Fetching departures"
        );

        let response = self
            .client
            .get_departures_by_stop(
                &self.target.stop_id,
                self.target.route_id.as_deref(),
                Some(self.departure_count),
            )
            .await?;

        if response.departures.is_empty() {
            debug!("No departures found");
            return Ok(None);
        }

        let next = select_next_departure(
            &response.departures,
            self.target.direction_filter.as_deref(),
        )
        .cloned();

        match &next {
            Some(departure) => debug!(
                headsign = %departure.headsign,
                expected_mins = departure.expected_mins,
                "Next departure selected"
            ),
            None => debug!(
                direction = self.key.direction(),
                "No departures match direction filter"
            ),
        }

        Ok(next)
    }

    /// Run one refresh and publish the outcome
    ///
    /// Success (including "nothing found") replaces the data. Failure keeps
    /// the previous data and marks the target stale; the error is returned
    /// for callers that care and is already recorded in the state.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn refresh(&self) -> Result<Option<Departure>, ApplicationError> {
        let previous = self.state.borrow().status();

        match self.fetch().await {
            Ok(next) => {
                self.state
                    .send_modify(|state| state.record_success(next.clone()));
                if previous == RefreshStatus::Stale {
                    info!("Departure data recovered");
                }
                Ok(next)
            },
            Err(e) => {
                self.state.send_modify(|state| state.record_failure(&e));
                if previous == RefreshStatus::Stale {
                    debug!(error = %e, "Refresh still failing");
                } else {
                    warn!(error = %e, "Error fetching bus data, keeping last departure");
                }
                Err(ApplicationError::Refresh {
                    target: self.key.clone(),
                    source: e,
                })
            },
        }
    }

    /// Initial refresh that gates readiness
    ///
    /// # Errors
    ///
    /// Returns `SetupFailed` if the refresh fails; the target must not start.
    pub async fn first_refresh(&self) -> Result<(), ApplicationError> {
        match self.refresh().await {
            Ok(_) => Ok(()),
            Err(ApplicationError::Refresh { target, source }) => {
                Err(ApplicationError::SetupFailed { target, source })
            },
            Err(e) => Err(e),
        }
    }

    /// Spawn the periodic refresh task
    ///
    /// The first refresh is expected to have run already, so the first tick
    /// fires one `period` after spawning. Abort the returned handle to stop.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        debug!(key = %self.key, interval_secs = period.as_secs(), "Starting refresh task");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                // Failures are recorded in the state and logged by `refresh`.
                let _ = self.refresh().await;
            }
        })
    }
}
