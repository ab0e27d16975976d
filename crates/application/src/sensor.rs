//! Next-bus sensor view
//!
//! Read-only projection of one target's [`RefreshState`] for presentation.

use domain::{EntryId, StopFilterConfig};
use integration_cumtd::Departure;
use serde::Serialize;
use tokio::sync::watch;

use crate::coordinator::{RefreshState, RefreshStatus};

/// Unit of the sensor reading
pub const UNIT_OF_MEASUREMENT: &str = "min";

/// Icon shown next to the sensor
pub const ICON: &str = "mdi:bus";

/// Attribute bundle describing the current departure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorAttributes {
    /// Destination shown on the bus
    pub headsign: String,
    /// Trip direction, if the API reported one
    pub direction: Option<String>,
    /// Route short name
    pub route: Option<String>,
    /// Scheduled departure, RFC 3339
    pub scheduled: String,
    /// Expected departure, RFC 3339
    pub expected: String,
    /// Whether `expected` comes from live tracking
    pub is_real_time: bool,
    /// Stop the departure leaves from (may be a boarding point like `IT:1`)
    pub stop_id: String,
    /// Configured stop name
    pub stop_name: String,
    pub trip_id: Option<String>,
}

impl SensorAttributes {
    fn from_departure(departure: &Departure, stop_name: &str) -> Self {
        Self {
            headsign: departure.headsign.clone(),
            direction: departure.direction().map(str::to_string),
            route: departure.route.route_short_name.clone(),
            scheduled: departure.scheduled.to_rfc3339(),
            expected: departure.expected.to_rfc3339(),
            is_real_time: departure.is_monitored,
            stop_id: departure.stop_id.clone(),
            stop_name: stop_name.to_string(),
            trip_id: departure.trip_id().map(str::to_string),
        }
    }
}

/// Point-in-time view of a sensor, suitable for JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorSnapshot {
    pub unique_id: String,
    pub name: String,
    pub state: Option<u32>,
    pub unit_of_measurement: &'static str,
    pub icon: &'static str,
    pub available: bool,
    pub status: String,
    pub attributes: Option<SensorAttributes>,
    pub last_error: Option<String>,
}

/// Sensor reporting minutes until the next matching bus
#[derive(Debug, Clone)]
pub struct NextBusSensor {
    entry_id: EntryId,
    target: StopFilterConfig,
    state: watch::Receiver<RefreshState>,
}

impl NextBusSensor {
    /// Attach a sensor to a coordinator's state channel
    pub fn new(
        entry_id: EntryId,
        target: StopFilterConfig,
        state: watch::Receiver<RefreshState>,
    ) -> Self {
        Self {
            entry_id,
            target,
            state,
        }
    }

    /// Display name, e.g. `"Illinois Terminal (Route 5, East) Next Bus"`
    pub fn name(&self) -> String {
        self.target.display_name()
    }

    /// Stable id built from the entry and the target key
    pub fn unique_id(&self) -> String {
        self.target.target_key().unique_id(&self.entry_id)
    }

    pub const fn unit_of_measurement(&self) -> &'static str {
        UNIT_OF_MEASUREMENT
    }

    pub const fn icon(&self) -> &'static str {
        ICON
    }

    /// Minutes until the current departure, `None` without data
    pub fn native_value(&self) -> Option<u32> {
        self.state
            .borrow()
            .last_data
            .as_ref()
            .map(|d| d.expected_mins)
    }

    /// Whether the last refresh succeeded
    pub fn available(&self) -> bool {
        self.state.borrow().last_success
    }

    pub fn attributes(&self) -> Option<SensorAttributes> {
        self.state
            .borrow()
            .last_data
            .as_ref()
            .map(|d| SensorAttributes::from_departure(d, self.target.stop_label()))
    }

    pub fn status(&self) -> RefreshStatus {
        self.state.borrow().status()
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        let state = self.state.borrow();
        SensorSnapshot {
            unique_id: self.unique_id(),
            name: self.name(),
            state: state.last_data.as_ref().map(|d| d.expected_mins),
            unit_of_measurement: UNIT_OF_MEASUREMENT,
            icon: ICON,
            available: state.last_success,
            status: state.status().to_string(),
            attributes: state
                .last_data
                .as_ref()
                .map(|d| SensorAttributes::from_departure(d, self.target.stop_label())),
            last_error: state.last_error.clone(),
        }
    }

    /// Wait for the next completed refresh
    ///
    /// Returns `false` once the coordinator has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}
