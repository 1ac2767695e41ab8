//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDocumentStore`] - Persistent document collections and sequence counters

pub mod document_store;

pub use document_store::{
    fields, validate_field_path, Document, DocumentFilter, DuplicateKey, IDocumentStore, Sort,
    SortDirection, ID_FIELD,
};
