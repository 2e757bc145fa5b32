//! Repository Layer - Core Traits
//!
//! Abstract interfaces for data access. Implementations in this crate are
//! SQLite-backed, but nothing here depends on that.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{DomainResult, Entity};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// Overwrite an existing entity; `NotFound` when it does not exist
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID; `NotFound` when it does not exist
    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// Extension for entities that belong to a list
#[async_trait]
pub trait ListScoped<T: Entity>: Repository<T> {
    /// All entities of one list, ordered by position then creation
    async fn list_by_list(&self, list_id: Uuid) -> DomainResult<Vec<T>>;
}

/// Extension for partial updates
#[async_trait]
pub trait Patchable<T: Entity, P: Sync>: Repository<T> {
    /// Apply a patch and return the rows before and after it
    async fn patch(&self, id: T::Id, patch: &P) -> DomainResult<(T, T)>;
}
