//! Domain error types
//!
//! This module defines error types specific to domain operations
//! (validation failures, invalid state transitions, malformed identifiers)
//! and the [`AuditError`] taxonomy surfaced by the lifecycle use case.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Unknown collection name
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Unknown counter scope
    #[error("Unknown sequence scope: {0}")]
    UnknownScope(String),

    /// Document field path that cannot be used in a filter or sort
    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),

    /// The record no longer accepts changes to its answers
    #[error("Record {id} is {state} and no longer accepts answers")]
    RecordLocked {
        /// The record identifier
        id: String,
        /// The record's current state
        state: String,
    },
}

/// Failures returned by the audit lifecycle operations
///
/// Every variant carries a human-readable detail. None of them is retried
/// by the lifecycle itself; the only degradation path is the sequence
/// generator's clock fallback, which never produces an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Required input missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced record does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The underlying store could not be reached or rejected the query
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The operation is not permitted in the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A record with the same identifier already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A stored document could not be decoded into a record
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuditError {
    /// Short machine-readable kind, used in CLI output and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AuditError::Validation(_) => "validation",
            AuditError::NotFound(_) => "not_found",
            AuditError::StoreUnavailable(_) => "store_unavailable",
            AuditError::InvalidState(_) => "invalid_state",
            AuditError::Duplicate(_) => "duplicate",
            AuditError::Serialization(_) => "serialization",
        }
    }
}

impl From<DomainError> for AuditError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidState { .. } | DomainError::RecordLocked { .. } => {
                AuditError::InvalidState(e.to_string())
            }
            other => AuditError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidState {
            from: "completada".to_string(),
            to: "en_progreso".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from completada to en_progreso"
        );

        let err = AuditError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "Record not found: abc");
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: AuditError = DomainError::ValidationFailed("owner.id".to_string()).into();
        assert_eq!(err.kind(), "validation");

        let err: AuditError = DomainError::InvalidState {
            from: "completada".to_string(),
            to: "en_progreso".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "invalid_state");
    }
}
