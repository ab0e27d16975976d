//! Application layer - monitoring orchestration
//!
//! Turns configured targets into running refresh loops:
//! - [`selector`] picks the next departure for a direction filter
//! - [`coordinator`] refreshes one target on a fixed interval
//! - [`hub`] owns all targets of a configuration entry and applies reloads
//! - [`sensor`] exposes a target's state to presentation

pub mod coordinator;
pub mod error;
pub mod hub;
pub mod selector;
pub mod sensor;

#[cfg(test)]
mod testing;

pub use coordinator::{
    DEFAULT_DEPARTURE_COUNT, DEFAULT_SCAN_INTERVAL, RefreshCoordinator, RefreshState,
    RefreshStatus,
};
pub use error::ApplicationError;
pub use hub::{
    ClientFactory, EntryConfig, MonitorHub, MonitorRegistry, MonitorSettings, ReloadSummary,
};
pub use selector::select_next_departure;
pub use sensor::{NextBusSensor, SensorAttributes, SensorSnapshot};
