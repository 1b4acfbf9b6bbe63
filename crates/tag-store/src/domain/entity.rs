//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
///
/// `Validation`, `NotFound` and `Conflict` are resolved by the caller that
/// triggered them. Only `Persistence` is meant to reach the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DomainError {
    /// Rejected input, e.g. a duplicate or empty tag name
    #[error("Invalid input: {0}")]
    Validation(String),
    /// The referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// A structural edit that would break the tree
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Storage or transport failure during a write or read
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    /// True for errors that should be reported to the user
    pub fn surfaces_to_user(&self) -> bool {
        matches!(self, DomainError::Persistence(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                DomainError::Validation(
                    msg.clone()
                        .unwrap_or_else(|| "tag name already exists".to_string()),
                )
            }
            _ => DomainError::Persistence(e.to_string()),
        }
    }
}
