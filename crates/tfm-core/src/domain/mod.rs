//! Domain entities and business logic
//!
//! This module contains the core domain types of the audit lifecycle:
//! - Newtypes for validated record and owner identifiers
//! - The audit record, its state machine and completion summary
//! - Logical collections and sequence counter scopes
//! - Domain-specific error types

pub mod audit;
pub mod collection;
pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use audit::{Answers, AuditRecord, AuditState, AuditSummary, Owner, OwnerInput};
pub use collection::{Collection, SequenceScope};
pub use errors::{AuditError, DomainError};
pub use newtypes::{OwnerId, RecordId};
