//! Use cases (interactors) for the audit service
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`AuditLifecycleUseCase`] - Start, merge, finalize, draft and list audits
//! - [`SequenceGenerator`] - Per-scope sequence numbers with clock fallback

pub mod audit_lifecycle;
pub mod next_sequence;

#[cfg(test)]
pub(crate) mod testing;

pub use audit_lifecycle::{AuditLifecycleUseCase, AuditResult};
pub use next_sequence::{fallback_sequence, SequenceGenerator};
