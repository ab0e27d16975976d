//! Test doubles shared by the unit tests of this crate

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use integration_cumtd::{
    CumtdClient, CumtdError, Departure, DeparturesResponse, Route, RoutesResponse, StopsResponse,
    Trip,
};
use parking_lot::Mutex;
use tokio::sync::watch;

fn base_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-01-15T10:00:00-06:00").unwrap()
}

/// A departure `mins` minutes out with the given direction
pub(crate) fn departure(direction: Option<&str>, mins: u32) -> Departure {
    let expected = base_time() + Duration::minutes(i64::from(mins));
    Departure {
        stop_id: "IT:1".to_string(),
        headsign: format!("Headsign {mins}"),
        route: Route {
            route_id: "GREEN".to_string(),
            route_short_name: Some("5".to_string()),
            route_long_name: None,
            route_color: None,
        },
        trip: Some(Trip {
            trip_id: Some(format!("trip-{mins}")),
            direction: direction.map(str::to_string),
            trip_headsign: None,
        }),
        expected,
        expected_mins: mins,
        scheduled: expected,
        is_monitored: true,
    }
}

pub(crate) fn departures_response(departures: Vec<Departure>) -> DeparturesResponse {
    DeparturesResponse {
        time: base_time(),
        departures,
    }
}

type DeparturesResponder =
    Box<dyn Fn(&str, Option<&str>) -> Result<DeparturesResponse, CumtdError> + Send + Sync>;
type ValidateResponder = Box<dyn Fn() -> Result<bool, CumtdError> + Send + Sync>;

/// One recorded `get_departures_by_stop` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub stop_id: String,
    pub route_id: Option<String>,
    pub count: Option<u32>,
}

/// Scriptable in-memory client
pub(crate) struct FakeClient {
    departures: Mutex<DeparturesResponder>,
    validate: Mutex<ValidateResponder>,
    requests: Mutex<Vec<RecordedRequest>>,
    close_calls: AtomicUsize,
    // Departures calls wait here while the gate is closed
    gate: watch::Sender<bool>,
}

impl FakeClient {
    /// Client that answers every departures call with an empty list
    pub(crate) fn new() -> Self {
        Self {
            departures: Mutex::new(Box::new(|_: &str, _: Option<&str>| {
                Ok(departures_response(Vec::new()))
            })),
            validate: Mutex::new(Box::new(|| Ok(true))),
            requests: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            gate: watch::Sender::new(true),
        }
    }

    /// Client that always returns `departures`
    pub(crate) fn with_departures(departures: Vec<Departure>) -> Self {
        let client = Self::new();
        client.respond_with(move |_, _| Ok(departures_response(departures.clone())));
        client
    }

    pub(crate) fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&str, Option<&str>) -> Result<DeparturesResponse, CumtdError> + Send + Sync + 'static,
    {
        *self.departures.lock() = Box::new(responder);
    }

    pub(crate) fn validate_with<F>(&self, responder: F)
    where
        F: Fn() -> Result<bool, CumtdError> + Send + Sync + 'static,
    {
        *self.validate.lock() = Box::new(responder);
    }

    /// Park every following departures call after it is recorded
    pub(crate) fn hold_requests(&self) {
        self.gate.send_replace(false);
    }

    /// Let parked and future departures calls answer
    pub(crate) fn release_requests(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn request_count_for(&self, stop_id: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.stop_id == stop_id)
            .count()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CumtdClient for FakeClient {
    async fn validate_credential(&self) -> Result<bool, CumtdError> {
        (*self.validate.lock())()
    }

    async fn get_departures_by_stop(
        &self,
        stop_id: &str,
        route_id: Option<&str>,
        count: Option<u32>,
    ) -> Result<DeparturesResponse, CumtdError> {
        self.requests.lock().push(RecordedRequest {
            stop_id: stop_id.to_string(),
            route_id: route_id.map(str::to_string),
            count,
        });
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        (*self.departures.lock())(stop_id, route_id)
    }

    async fn get_stops_by_search(&self, _query: &str) -> Result<StopsResponse, CumtdError> {
        Ok(StopsResponse {
            time: base_time(),
            stops: Vec::new(),
        })
    }

    async fn get_routes_by_stop(&self, _stop_id: &str) -> Result<RoutesResponse, CumtdError> {
        Ok(RoutesResponse {
            time: base_time(),
            routes: Vec::new(),
        })
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shorthand for an `Arc<FakeClient>` plus its trait-object view
pub(crate) fn shared(client: FakeClient) -> (Arc<FakeClient>, Arc<dyn CumtdClient>) {
    let client = Arc::new(client);
    let dyn_client: Arc<dyn CumtdClient> = client.clone();
    (client, dyn_client)
}
