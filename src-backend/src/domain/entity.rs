//! Domain Layer - Core Entity Trait
//!
//! Every stored record has a unique id and can cross threads.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use noto::{StoreError, TodoGroup, TodoItem, TodoList};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

impl Entity for TodoList {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Entity for TodoGroup {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Entity for TodoItem {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for DomainError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DomainError::Conflict(msg.unwrap_or_else(|| code.to_string()))
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => StoreError::NotFound(msg),
            DomainError::InvalidInput(msg) => StoreError::InvalidInput(msg),
            other => StoreError::Datastore(other.to_string()),
        }
    }
}
