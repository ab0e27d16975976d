//! MTD data models
//!
//! Typed representations of the departures, stops and routes returned by the
//! MTD developer API. Unknown fields in the payload are ignored; missing
//! required fields are a parse error.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A transit line serving a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Internal route identifier (e.g. `"GREEN"`)
    pub route_id: String,
    /// Rider-facing label (e.g. `"5"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_short_name: Option<String>,
    /// Long descriptive name (e.g. `"Green"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_long_name: Option<String>,
    /// Route color as a hex string without leading `#`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_color: Option<String>,
}

impl Route {
    /// Label to show riders, falling back to the route id
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.route_short_name.as_deref().unwrap_or(&self.route_id)
    }
}

/// Trip metadata attached to a departure; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    /// Trip identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    /// Free-text direction label (e.g. `"Eastbound"`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Headsign of the trip as a whole
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_headsign: Option<String>,
}

/// One predicted or scheduled bus arrival at a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Stop (or stop point) the bus arrives at
    pub stop_id: String,
    /// Rider-facing destination label
    pub headsign: String,
    /// Line serving this departure
    pub route: Route,
    /// Trip metadata, absent or `null` for some departures
    #[serde(default)]
    pub trip: Option<Trip>,
    /// Predicted arrival
    pub expected: DateTime<FixedOffset>,
    /// Minutes until the predicted arrival
    pub expected_mins: u32,
    /// Timetabled arrival
    pub scheduled: DateTime<FixedOffset>,
    /// Backed by live vehicle tracking rather than the timetable alone
    pub is_monitored: bool,
}

impl Departure {
    /// Direction of travel, if the trip carries one
    #[must_use]
    pub fn direction(&self) -> Option<&str> {
        self.trip.as_ref().and_then(|t| t.direction.as_deref())
    }

    /// Trip identifier, if the trip carries one
    #[must_use]
    pub fn trip_id(&self) -> Option<&str> {
        self.trip.as_ref().and_then(|t| t.trip_id.as_deref())
    }

    /// Delay of the predicted arrival against the timetable, in whole minutes
    #[must_use]
    pub fn delay_minutes(&self) -> i64 {
        (self.expected - self.scheduled).num_minutes()
    }
}

impl fmt::Display for Departure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {} min",
            self.route.display_name(),
            self.headsign,
            self.expected_mins
        )?;
        if let Some(direction) = self.direction() {
            write!(f, " ({direction})")?;
        }
        if !self.is_monitored {
            write!(f, " [scheduled]")?;
        }
        Ok(())
    }
}

/// A bus stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Stop identifier (e.g. `"IT"`)
    pub stop_id: String,
    /// Human-readable stop name
    pub stop_name: String,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.stop_name, self.stop_id)
    }
}

/// Result of `getdeparturesbystop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeparturesResponse {
    /// Server time of the response
    pub time: DateTime<FixedOffset>,
    /// Upcoming departures, in server order
    #[serde(default)]
    pub departures: Vec<Departure>,
}

/// Result of `getstops` (optionally narrowed by a client-side search)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopsResponse {
    /// Server time of the response
    pub time: DateTime<FixedOffset>,
    /// Stops
    #[serde(default)]
    pub stops: Vec<Stop>,
}

/// Result of `getroutesbystop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutesResponse {
    /// Server time of the response
    pub time: DateTime<FixedOffset>,
    /// Routes serving the stop
    #[serde(default)]
    pub routes: Vec<Route>,
}
