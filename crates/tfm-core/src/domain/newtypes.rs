//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for record and owner identifiers. Each newtype
//! ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Prefix used for draft identifiers
pub const DRAFT_ID_PREFIX: &str = "BORRADOR";

// ============================================================================
// RecordId
// ============================================================================

/// Identifier of an audit record
///
/// Either an opaque generated identifier (32 lowercase hex characters) or,
/// for drafts, the composite `BORRADOR_<timestamp-ms>_<owner-id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Create a RecordId from an existing string
    ///
    /// Any non-empty string is accepted, since draft ids embed the owner id
    /// verbatim and owner ids are free text.
    ///
    /// # Errors
    /// Returns error if the id is empty
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidId("Record ID cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Generate a new random opaque identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Build the deterministic draft identifier for an owner at a given instant
    #[must_use]
    pub fn for_draft(timestamp_ms: i64, owner: &OwnerId) -> Self {
        Self(format!("{DRAFT_ID_PREFIX}_{timestamp_ms}_{owner}"))
    }

    /// Returns true if this identifier follows the draft naming scheme
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.0.starts_with(DRAFT_ID_PREFIX)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RecordId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

// ============================================================================
// OwnerId
// ============================================================================

/// Identifier of the client that owns an audit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new OwnerId
    ///
    /// # Errors
    /// Returns error if the id is blank
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "owner.id is required".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OwnerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for OwnerId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<OwnerId> for String {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

// ============================================================================
// Tests
// ============================================================================
