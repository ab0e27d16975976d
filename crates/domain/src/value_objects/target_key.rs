//! Monitored target identity key

use std::fmt;

use serde::{Deserialize, Serialize};

use super::EntryId;

/// Placeholder used when a filter is not set
pub const ALL: &str = "all";

/// Identity of a monitored target: `(stop_id, route_id | "all", direction | "all")`
///
/// Two targets with equal keys must not be monitored side by side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetKey {
    stop_id: String,
    route: String,
    direction: String,
}

impl TargetKey {
    /// Build a key from the raw filter values
    pub fn new(stop_id: &str, route_id: Option<&str>, direction: Option<&str>) -> Self {
        Self {
            stop_id: stop_id.to_string(),
            route: route_id.filter(|r| !r.is_empty()).unwrap_or(ALL).to_string(),
            direction: direction.filter(|d| !d.is_empty()).unwrap_or(ALL).to_string(),
        }
    }

    /// Stop component
    pub fn stop_id(&self) -> &str {
        &self.stop_id
    }

    /// Route component (`"all"` when unfiltered)
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Direction component (`"all"` when unfiltered)
    pub fn direction(&self) -> &str {
        &self.direction
    }

    /// Stable identifier for the presentation layer, scoped to a config entry
    ///
    /// Separators are replaced by `_` and everything is lowercased so the
    /// result is safe to use as an entity id.
    pub fn unique_id(&self, entry: &EntryId) -> String {
        let stop = self.stop_id.replace([':', ' '], "_").to_lowercase();
        let route = self.route.replace(' ', "_").to_lowercase();
        let direction = self.direction.replace(' ', "_").to_lowercase();
        format!("{entry}_{stop}_{route}_{direction}")
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.stop_id, self.route, self.direction)
    }
}
