//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Two monitored targets share the same identity key
    #[error("Duplicate monitored target: {0}")]
    DuplicateTarget(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_message() {
        let err = DomainError::ValidationError("stop_id must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation failed: stop_id must not be empty"
        );
    }

    #[test]
    fn duplicate_target_error_message() {
        let err = DomainError::DuplicateTarget("IT/all/all".to_string());
        assert_eq!(err.to_string(), "Duplicate monitored target: IT/all/all");
    }
}
