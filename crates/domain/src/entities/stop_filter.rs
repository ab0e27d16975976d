//! Monitored stop configuration

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::DomainError;
use crate::value_objects::TargetKey;

/// One configured monitoring target: a stop plus optional route and direction filters
///
/// Created and edited by the configuration layer; read-only to the monitor.
/// Empty strings for the optional fields are treated as unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopFilterConfig {
    /// Stop identifier (required)
    pub stop_id: String,

    /// Human-readable stop name; `None` when the configuration never recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_name: Option<String>,

    /// Server-side route filter
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,

    /// Client-side direction filter (case-insensitive)
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub direction_filter: Option<String>,

    /// User label overriding the stop name
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
}

impl StopFilterConfig {
    /// Create an unfiltered target for a stop
    pub fn new(stop_id: impl Into<String>, stop_name: impl Into<String>) -> Self {
        Self {
            stop_id: stop_id.into(),
            stop_name: Some(stop_name.into()),
            route_id: None,
            direction_filter: None,
            custom_name: None,
        }
    }

    /// Restrict to one route
    #[must_use]
    pub fn with_route(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = non_empty(route_id.into());
        self
    }

    /// Restrict to one direction of travel
    #[must_use]
    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction_filter = non_empty(direction.into());
        self
    }

    /// Set a display label
    #[must_use]
    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = non_empty(name.into());
        self
    }

    /// Identity key of this target
    pub fn target_key(&self) -> TargetKey {
        TargetKey::new(
            &self.stop_id,
            self.route_id.as_deref(),
            self.direction_filter.as_deref(),
        )
    }

    /// Stop name, falling back to the stop id when no name was recorded
    pub fn stop_label(&self) -> &str {
        self.stop_name.as_deref().unwrap_or(&self.stop_id)
    }

    /// Display name, e.g. `"Illinois Terminal (Route 5, Eastbound) Next Bus"`
    pub fn display_name(&self) -> String {
        let base = self
            .custom_name
            .as_deref()
            .or_else(|| Some(self.stop_label()).filter(|n| !n.is_empty()))
            .unwrap_or("Bus Stop");

        let mut filters = Vec::new();
        if let Some(route) = &self.route_id {
            filters.push(format!("Route {route}"));
        }
        if let Some(direction) = &self.direction_filter {
            filters.push(direction.clone());
        }

        if filters.is_empty() {
            format!("{base} Next Bus")
        } else {
            format!("{base} ({}) Next Bus", filters.join(", "))
        }
    }

    /// Validate a single target
    ///
    /// # Errors
    ///
    /// Returns an error if the stop id is blank.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.stop_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "stop_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate a target list: every entry valid and no two sharing a key
///
/// # Errors
///
/// Returns the first invalid entry or the first duplicated key.
pub fn validate_targets(targets: &[StopFilterConfig]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(targets.len());
    for target in targets {
        target.validate()?;
        let key = target.target_key();
        if !seen.insert(key.clone()) {
            return Err(DomainError::DuplicateTarget(key.to_string()));
        }
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(non_empty))
}
