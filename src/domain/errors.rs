//! Catalog errors
//!
//! Every failure the catalog can report to a caller. The HTTP layer maps
//! each variant onto a status class.

use thiserror::Error;

use crate::domain::value_objects::CharacterId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// Blank required field, invalid enum value, malformed id
    #[error("{0}")]
    InvalidInput(String),

    /// A name given in the request does not resolve to an entity
    #[error("{kind} '{name}' not found")]
    UnresolvedReference { kind: &'static str, name: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{kind} with this name already exists")]
    DuplicateName { kind: &'static str, name: String },

    #[error("domain expansion '{name}' already assigned to character id {owner}")]
    ExpansionAlreadyOwned { name: String, owner: CharacterId },

    #[error("sentinel clan '{0}' cannot be deleted or renamed")]
    ProtectedSentinel(String),

    /// Deployment defect: the fallback clan is gone
    #[error("sentinel clan '{0}' not found")]
    MissingSentinel(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CatalogError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unresolved(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            name: name.into(),
        }
    }

    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Server-side fault rather than a problem with the request
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingSentinel(_) | Self::Storage(_))
    }
}
