//! Domain Layer
//!
//! Stored entities are the client row types; this layer adds identity
//! and the error vocabulary shared by the repositories.

mod entity;

pub use entity::{DomainError, DomainResult, Entity};
pub use noto::{GroupPatch, ItemPatch, ListPatch, TodoGroup, TodoItem, TodoList};
