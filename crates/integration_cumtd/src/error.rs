//! MTD API error types

use thiserror::Error;

/// Errors that can occur when talking to the MTD developer API
#[derive(Debug, Error)]
pub enum CumtdError {
    /// The API rejected the credential (HTTP 401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API was reachable but reported a non-200 in-band status
    #[error("API error {code}: {message}")]
    Api {
        /// Status code embedded in the response body
        code: u16,
        /// Status message embedded in the response body
        message: String,
    },

    /// Connection to the API failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP request failed with a non-success status and no usable body
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body was not valid JSON or lacked a required field
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// The client session was closed and cannot be used any more
    #[error("Client session is closed")]
    SessionClosed,
}

impl CumtdError {
    /// Returns true if the credential itself was rejected
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Returns true if the same request may succeed on a later attempt
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api { .. }
                | Self::ConnectionFailed(_)
                | Self::RequestFailed(_)
                | Self::Timeout { .. }
        )
    }
}
