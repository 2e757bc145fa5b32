//! Noto Client Core
//!
//! Framework-agnostic logic behind the collaborative todo lists:
//! - models: list, group and item rows plus partial updates
//! - datastore: the async seam to the hosted store
//! - store: cached list state with optimistic writes
//! - sync: change-feed subscription and background reconciliation
//! - import: markdown-like bulk import parser
//! - share / view: share links, routing and display shaping

pub mod datastore;
pub mod import;
pub mod models;
pub mod share;
pub mod store;
pub mod sync;
pub mod view;

pub use datastore::{Datastore, StoreError, StoreResult};
pub use import::{parse_markdown_todos, ImportSummary, ParsedGroup, ParsedItem};
pub use models::{GroupPatch, ItemPatch, ListPatch, TodoGroup, TodoItem, TodoList};
pub use store::{create_list, ListState, ListStore, DEFAULT_LIST_NAME};
pub use sync::{ChangeEvent, ChangeFeed, ConnectionStatus, Reconciler, TodoSync};
