//! MTD developer API client
//!
//! Wraps the three read-only endpoints used for departure tracking
//! (`getstops`, `getroutesbystop`, `getdeparturesbystop`). The credential is
//! sent as the `key` query parameter on every call.
//!
//! The underlying HTTP session is opened lazily on first use. Building a
//! `reqwest::Client` loads the TLS root store, which blocks, so it happens on
//! the blocking pool rather than in [`MtdClient::new`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::CumtdConfig;
use crate::error::CumtdError;
use crate::models::{DeparturesResponse, RoutesResponse, StopsResponse};

const GET_STOPS: &str = "getstops";
const GET_ROUTES_BY_STOP: &str = "getroutesbystop";
const GET_DEPARTURES_BY_STOP: &str = "getdeparturesbystop";

/// In-band status code the API uses for success
const STATUS_OK: u16 = 200;

/// Trait for MTD API clients
///
/// Implementations must be safe to share between many monitored targets.
#[async_trait]
pub trait CumtdClient: Send + Sync {
    /// Check the credential with a cheap request
    ///
    /// Only an authentication failure invalidates the credential; any other
    /// in-band API error still counts as a working key.
    async fn validate_credential(&self) -> Result<bool, CumtdError>;

    /// Upcoming departures at a stop, in server order
    ///
    /// `route_id` is forwarded to the server as a filter; the server does not
    /// apply it reliably for every route.
    async fn get_departures_by_stop(
        &self,
        stop_id: &str,
        route_id: Option<&str>,
        count: Option<u32>,
    ) -> Result<DeparturesResponse, CumtdError>;

    /// Stops whose name contains `query`, case-insensitively
    async fn get_stops_by_search(&self, query: &str) -> Result<StopsResponse, CumtdError>;

    /// Every route that serves a stop, running or not
    async fn get_routes_by_stop(&self, stop_id: &str) -> Result<RoutesResponse, CumtdError>;

    /// Release the HTTP session. Idempotent and terminal.
    async fn close(&self);
}

#[derive(Debug)]
enum Session {
    Unopened,
    Open(Client),
    Closed,
}

/// HTTP client for the MTD developer API
#[derive(Debug)]
pub struct MtdClient {
    config: CumtdConfig,
    api_key: SecretString,
    session: Mutex<Session>,
    sessions_opened: AtomicUsize,
}

impl MtdClient {
    /// Create a new client. No connection is made until the first request.
    #[must_use]
    pub fn new(config: &CumtdConfig, api_key: SecretString) -> Self {
        Self {
            config: config.clone(),
            api_key,
            session: Mutex::new(Session::Unopened),
            sessions_opened: AtomicUsize::new(0),
        }
    }

    /// Whether an HTTP session is currently open
    pub async fn is_open(&self) -> bool {
        matches!(*self.session.lock().await, Session::Open(_))
    }

    /// Number of HTTP sessions this client has opened (0 or 1)
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    /// Return the shared HTTP session, opening it on first use
    ///
    /// Concurrent first callers queue on the lock; the first one builds the
    /// session and the rest reuse it.
    async fn session(&self) -> Result<Client, CumtdError> {
        let mut guard = self.session.lock().await;
        match &*guard {
            Session::Open(client) => return Ok(client.clone()),
            Session::Closed => return Err(CumtdError::SessionClosed),
            Session::Unopened => {},
        }

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let client = tokio::task::spawn_blocking(move || build_http_client(timeout))
            .await
            .map_err(|e| CumtdError::ConnectionFailed(format!("session setup aborted: {e}")))??;

        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        debug!(timeout_secs = self.config.timeout_secs, "Opened MTD HTTP session");
        *guard = Session::Open(client.clone());
        Ok(client)
    }

    /// Issue one authenticated GET and classify the outcome
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, CumtdError> {
        let client = self.session().await?;
        let url = self.config.method_url(method);

        debug!(%url, "Calling MTD API");

        let response = client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(CumtdError::Authentication("Invalid API key".to_string()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        Self::parse_body(status, &body)
    }

    fn transport_error(&self, err: &reqwest::Error) -> CumtdError {
        if err.is_timeout() {
            CumtdError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            CumtdError::ConnectionFailed(err.to_string())
        }
    }

    /// Decode a response body, surfacing the in-band status first
    ///
    /// A non-2xx response without an in-band error is a `RequestFailed`,
    /// whatever its body looks like.
    fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, CumtdError> {
        let http_failure = || CumtdError::RequestFailed(format!("HTTP {status}"));

        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => return Err(http_failure()),
            Err(e) => return Err(CumtdError::ParseError(e.to_string())),
        };

        let api_status = value
            .get("status")
            .map(ApiStatus::deserialize)
            .transpose()
            .map_err(|e| CumtdError::ParseError(format!("invalid status object: {e}")));

        match api_status {
            Ok(Some(api_status)) if api_status.code != STATUS_OK => {
                return Err(CumtdError::Api {
                    code: api_status.code,
                    message: api_status.msg,
                });
            },
            _ if !status.is_success() => return Err(http_failure()),
            Err(e) => return Err(e),
            Ok(_) => {},
        }

        serde_json::from_value(value).map_err(|e| CumtdError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl CumtdClient for MtdClient {
    #[instrument(skip(self))]
    async fn validate_credential(&self) -> Result<bool, CumtdError> {
        match self
            .request::<serde_json::Value>(GET_STOPS, &[])
            .await
        {
            Ok(_) => Ok(true),
            Err(CumtdError::Api { code, message }) => {
                debug!(code, %message, "API error during validation, credential accepted");
                Ok(true)
            },
            Err(e) => {
                if e.is_authentication() {
                    warn!("MTD API rejected the credential");
                }
                Err(e)
            },
        }
    }

    #[instrument(skip(self))]
    async fn get_departures_by_stop(
        &self,
        stop_id: &str,
        route_id: Option<&str>,
        count: Option<u32>,
    ) -> Result<DeparturesResponse, CumtdError> {
        let mut params = vec![("stop_id", stop_id.to_string())];
        if let Some(route_id) = route_id {
            params.push(("route_id", route_id.to_string()));
        }
        if let Some(count) = count {
            params.push(("count", count.to_string()));
        }

        let response: DeparturesResponse = self.request(GET_DEPARTURES_BY_STOP, &params).await?;
        debug!(count = response.departures.len(), "Departures fetched");
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn get_stops_by_search(&self, query: &str) -> Result<StopsResponse, CumtdError> {
        // The API has no search endpoint; filter the full list locally.
        let mut response: StopsResponse = self.request(GET_STOPS, &[]).await?;

        let needle = query.to_lowercase();
        response
            .stops
            .retain(|stop| stop.stop_name.to_lowercase().contains(&needle));

        debug!(count = response.stops.len(), "Stops matched");
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn get_routes_by_stop(&self, stop_id: &str) -> Result<RoutesResponse, CumtdError> {
        let params = [("stop_id", stop_id.to_string())];
        self.request(GET_ROUTES_BY_STOP, &params).await
    }

    async fn close(&self) {
        let mut guard = self.session.lock().await;
        if matches!(*guard, Session::Open(_)) {
            debug!("Closing MTD HTTP session");
        }
        *guard = Session::Closed;
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, CumtdError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cumtd-bus/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CumtdError::ConnectionFailed(e.to_string()))
}

// --- Raw API response types for deserialization ---

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u16,
    #[serde(default)]
    msg: String,
}
