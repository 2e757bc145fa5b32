//! Datastore Seam
//!
//! Abstract interface to the hosted relational store.
//! The store is the source of truth; everything the client caches
//! must be reconstructible from these calls.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{GroupPatch, ItemPatch, ListPatch, TodoGroup, TodoItem, TodoList};

/// Result type for datastore and store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to the caller of any store operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Datastore error: {0}")]
    Datastore(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Row-level access to lists, groups and items.
///
/// Fetches of groups and items come back ordered by `position`.
/// Updates take partial patches and touch only the given fields.
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn insert_list(&self, list: &TodoList) -> StoreResult<()>;

    /// Fails with `StoreError::NotFound` when no such list exists
    async fn fetch_list(&self, id: Uuid) -> StoreResult<TodoList>;

    async fn update_list(&self, id: Uuid, patch: &ListPatch) -> StoreResult<()>;

    async fn fetch_groups(&self, list_id: Uuid) -> StoreResult<Vec<TodoGroup>>;

    async fn insert_groups(&self, groups: &[TodoGroup]) -> StoreResult<()>;

    async fn update_group(&self, id: Uuid, patch: &GroupPatch) -> StoreResult<()>;

    /// Deletes the group and every item that references it
    async fn delete_group(&self, id: Uuid) -> StoreResult<()>;

    async fn fetch_items(&self, list_id: Uuid) -> StoreResult<Vec<TodoItem>>;

    async fn insert_items(&self, items: &[TodoItem]) -> StoreResult<()>;

    async fn update_item(&self, id: Uuid, patch: &ItemPatch) -> StoreResult<()>;

    async fn delete_item(&self, id: Uuid) -> StoreResult<()>;
}
