//! Champaign-Urbana MTD integration
//!
//! Client for the [MTD developer API](https://developer.cumtd.com) (v2.2,
//! JSON). Provides real-time departures by stop, stop search and
//! routes-by-stop lookups.
//!
//! # Architecture
//!
//! [`CumtdClient`] defines the interface used by the monitoring layer and is
//! implemented by [`MtdClient`]. One client instance is meant to be shared by
//! every monitored stop; it holds a single lazily opened HTTP session.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_cumtd::{CumtdClient, CumtdConfig, MtdClient};
//! use secrecy::SecretString;
//!
//! let client = MtdClient::new(&CumtdConfig::default(), SecretString::from("my-key"));
//! let response = client.get_departures_by_stop("IT", None, Some(5)).await?;
//! for departure in &response.departures {
//!     println!("{departure}");
//! }
//! client.close().await;
//! ```

mod client;
mod config;
mod error;
mod models;

pub use client::{CumtdClient, MtdClient};
pub use config::CumtdConfig;
pub use error::CumtdError;
pub use models::{
    Departure, DeparturesResponse, Route, RoutesResponse, Stop, StopsResponse, Trip,
};
