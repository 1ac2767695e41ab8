//! Document store port (driven/secondary port)
//!
//! This module defines the interface for persisting and querying audit
//! documents grouped in logical collections, plus the atomic per-scope
//! counters used for sequence numbering.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, document databases, ...). The one failure the core needs to
//!   tell apart, an identifier collision, is reported by wrapping
//!   [`DuplicateKey`] so callers can `downcast_ref` it.
//! - [`DocumentFilter`] and [`Sort`] describe queries without exposing the
//!   storage query language. Field paths are dotted (`cliente.id`) and
//!   validated with [`validate_field_path`].
//! - `increment_counter` must be a single atomic increment-and-fetch; a
//!   read-then-write implementation would hand out duplicate sequences
//!   under concurrent creation.

use serde_json::{Map, Value};

use crate::domain::{Collection, DomainError, SequenceScope};

/// A stored document: a JSON object whose `_id` field is its key
pub type Document = Map<String, Value>;

/// Name of the key field present in every document
pub const ID_FIELD: &str = "_id";

/// Field paths used by the lifecycle queries
pub mod fields {
    pub const ID: &str = super::ID_FIELD;
    pub const OWNER_ID: &str = "cliente.id";
    pub const STATE: &str = "estado";
    pub const SEQUENCE: &str = "sequence";
    pub const LAST_MODIFIED: &str = "ultimaModificacion";
    pub const ANSWERS: &str = "respuestas";
    pub const SUMMARY: &str = "resumen";
    pub const FINALIZED: &str = "finalizado";
    pub const AI_PROCESSED: &str = "procesadoIA";
}

/// Checks that a dotted field path only contains `[A-Za-z0-9_]` segments
///
/// # Errors
/// Returns `DomainError::InvalidFieldPath` for empty paths, empty segments
/// or unsupported characters.
pub fn validate_field_path(path: &str) -> Result<(), DomainError> {
    if path.is_empty() {
        return Err(DomainError::InvalidFieldPath("empty path".to_string()));
    }
    for segment in path.split('.') {
        if segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DomainError::InvalidFieldPath(path.to_string()));
        }
    }
    Ok(())
}

/// Error wrapped by adapters when an insert collides with an existing key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Duplicate key '{id}' in collection {collection}")]
pub struct DuplicateKey {
    /// Collection the insert targeted
    pub collection: Collection,
    /// The colliding identifier
    pub id: String,
}

// ============================================================================
// DocumentFilter
// ============================================================================

/// Equality conditions on document fields, combined with AND logic
///
/// An empty filter matches every document of the collection.
///
/// # Example
///
/// ```
/// use tfm_core::ports::{fields, DocumentFilter};
///
/// let filter = DocumentFilter::new()
///     .eq(fields::OWNER_ID, "u1")
///     .eq(fields::STATE, "borrador");
/// assert_eq!(filter.conditions().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    conditions: Vec<(String, Value)>,
}

impl DocumentFilter {
    /// Creates a new empty filter (matches all documents)
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter matching a single document key
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq(ID_FIELD, id.into())
    }

    /// Adds an equality condition on `field`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// Returns the conditions in insertion order
    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Returns true if no conditions are set
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

// ============================================================================
// Sort
// ============================================================================

/// Direction of a sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordered list of sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<(String, SortDirection)>,
}

impl Sort {
    /// No ordering (storage order)
    pub fn none() -> Self {
        Self::default()
    }

    /// Appends an ascending key
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortDirection::Ascending));
        self
    }

    /// Appends a descending key
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortDirection::Descending));
        self
    }

    pub fn keys(&self) -> &[(String, SortDirection)] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ============================================================================
// IDocumentStore trait
// ============================================================================

/// Port trait for the document store backing the audit lifecycle
///
/// ## Implementation Notes
///
/// - Every method must be safe to call concurrently from independent
///   requests; no method may rely on state held between calls.
/// - `update_one` applies `$set` semantics: each top-level field of the
///   patch replaces the stored field, other fields are left untouched.
/// - `increment_counter` creates the scope's counter at 1 when missing.
#[async_trait::async_trait]
pub trait IDocumentStore: Send + Sync {
    /// Inserts a new document keyed by its `_id` field
    ///
    /// Fails with a wrapped [`DuplicateKey`] if the key already exists.
    async fn insert(&self, collection: Collection, document: &Document) -> anyhow::Result<()>;

    /// Returns the first document matching `filter` in `sort` order
    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        sort: &Sort,
    ) -> anyhow::Result<Option<Document>>;

    /// Returns every document matching `filter` in `sort` order
    async fn find(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        sort: &Sort,
    ) -> anyhow::Result<Vec<Document>>;

    /// Sets the patch's top-level fields on the first matching document
    ///
    /// Returns the number of documents matched (0 or 1).
    async fn update_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        patch: &Document,
    ) -> anyhow::Result<u64>;

    /// Counts documents matching `filter`
    async fn count_documents(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> anyhow::Result<u64>;

    /// Atomically increments the scope's counter and returns the new value
    async fn increment_counter(&self, scope: SequenceScope) -> anyhow::Result<i64>;

    /// Returns true if the store is currently reachable
    async fn is_ready(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_field_path() {
        assert!(validate_field_path("cliente.id").is_ok());
        assert!(validate_field_path("_id").is_ok());
        assert!(validate_field_path("").is_err());
        assert!(validate_field_path("cliente..id").is_err());
        assert!(validate_field_path("estado') OR 1=1 --").is_err());
    }

    #[test]
    fn test_filter_builder() {
        let filter = DocumentFilter::by_id("abc").eq(fields::STATE, "en_progreso");
        assert_eq!(
            filter.conditions(),
            &[
                ("_id".to_string(), Value::from("abc")),
                ("estado".to_string(), Value::from("en_progreso")),
            ]
        );
        assert!(DocumentFilter::new().is_empty());
    }

    #[test]
    fn test_sort_builder_keeps_precedence() {
        let sort = Sort::none()
            .desc(fields::LAST_MODIFIED)
            .desc(fields::SEQUENCE);
        assert_eq!(sort.keys()[0].0, "ultimaModificacion");
        assert_eq!(sort.keys()[1].1, SortDirection::Descending);
        assert!(Sort::none().is_empty());
    }
}
