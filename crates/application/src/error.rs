//! Application-level errors

use domain::{DomainError, EntryId, TargetKey};
use integration_cumtd::CumtdError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A refresh of one target failed; the target keeps its last data
    #[error("Refresh failed for {target}: {source}")]
    Refresh {
        /// Target that failed
        target: TargetKey,
        /// Underlying client error
        source: CumtdError,
    },

    /// The first refresh of a target failed, so the target cannot start
    #[error("Setup failed for {target}: {source}")]
    SetupFailed {
        /// Target that failed
        target: TargetKey,
        /// Underlying client error
        source: CumtdError,
    },

    /// The credential was rejected by the API
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Client error outside of a target refresh
    #[error(transparent)]
    Client(CumtdError),

    /// A configuration entry with this id is already running
    #[error("Configuration entry already loaded: {0}")]
    EntryAlreadyLoaded(EntryId),

    /// No configuration entry with this id is running
    #[error("Configuration entry not loaded: {0}")]
    EntryNotLoaded(EntryId),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Refresh { source, .. } | Self::SetupFailed { source, .. } | Self::Client(source) => {
                source.is_retryable()
            },
            _ => false,
        }
    }

    /// Check if the credential was the cause
    pub fn is_authentication(&self) -> bool {
        match self {
            Self::InvalidCredential(_) => true,
            Self::Refresh { source, .. } | Self::SetupFailed { source, .. } | Self::Client(source) => {
                source.is_authentication()
            },
            _ => false,
        }
    }
}
