//! Logical collections and counter scopes
//!
//! Collections are resolved from user-supplied names through a fixed lookup
//! table, so an unknown or misspelled name is rejected instead of silently
//! addressing a new collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::audit::AuditState;

/// A logical collection of audit documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// In-progress and completed audits
    Auditorias,
    /// Saved drafts
    Borradores,
}

/// Name lookup table: every accepted spelling maps to one collection
const COLLECTION_NAMES: &[(&str, Collection)] = &[
    ("auditorias", Collection::Auditorias),
    ("auditoria", Collection::Auditorias),
    ("borradores", Collection::Borradores),
    ("borrador", Collection::Borradores),
];

impl Collection {
    /// All known collections
    pub const ALL: [Collection; 2] = [Collection::Auditorias, Collection::Borradores];

    /// Canonical storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Auditorias => "Auditorias",
            Collection::Borradores => "Borradores",
        }
    }

    /// Counter scope used to number records in this collection
    pub fn sequence_scope(&self) -> SequenceScope {
        match self {
            Collection::Auditorias => SequenceScope::Auditorias,
            Collection::Borradores => SequenceScope::Borradores,
        }
    }

    /// Collection that holds records in the given state
    pub fn for_state(state: &AuditState) -> Self {
        match state {
            AuditState::Draft => Collection::Borradores,
            AuditState::InProgress | AuditState::Completed => Collection::Auditorias,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Collection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        COLLECTION_NAMES
            .iter()
            .find(|(name, _)| *name == needle)
            .map(|(_, collection)| *collection)
            .ok_or_else(|| DomainError::UnknownCollection(s.to_string()))
    }
}

/// Scope of an independent sequence counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceScope {
    /// Numbering of the `Auditorias` collection
    Auditorias,
    /// Numbering of the `Borradores` collection
    Borradores,
}

impl SequenceScope {
    /// Identifier stored in the counters collection
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceScope::Auditorias => "auditorias",
            SequenceScope::Borradores => "borradores",
        }
    }
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SequenceScope {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auditorias" => Ok(SequenceScope::Auditorias),
            "borradores" => Ok(SequenceScope::Borradores),
            _ => Err(DomainError::UnknownScope(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_lookup_is_case_insensitive() {
        assert_eq!(
            Collection::from_str("AUDITORIAS").unwrap(),
            Collection::Auditorias
        );
        assert_eq!(
            Collection::from_str("Borradores").unwrap(),
            Collection::Borradores
        );
        assert_eq!(
            Collection::from_str(" borrador ").unwrap(),
            Collection::Borradores
        );
    }

    #[test]
    fn test_collection_lookup_rejects_unknown() {
        let err = Collection::from_str("Activos").unwrap_err();
        assert_eq!(err, DomainError::UnknownCollection("Activos".to_string()));
    }

    #[test]
    fn test_collection_for_state() {
        assert_eq!(
            Collection::for_state(&AuditState::Draft),
            Collection::Borradores
        );
        assert_eq!(
            Collection::for_state(&AuditState::InProgress),
            Collection::Auditorias
        );
        assert_eq!(
            Collection::for_state(&AuditState::Completed),
            Collection::Auditorias
        );
    }

    #[test]
    fn test_scope_roundtrip() {
        for collection in Collection::ALL {
            let scope = collection.sequence_scope();
            assert_eq!(SequenceScope::from_str(scope.as_str()).unwrap(), scope);
        }
        assert!(SequenceScope::from_str("counters").is_err());
    }
}
