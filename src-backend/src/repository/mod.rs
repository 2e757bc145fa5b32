//! Repository Layer
//!
//! Data access abstractions and their SQLite implementations.

mod columns;
mod db;
mod group_repo;
mod item_repo;
mod list_repo;
mod traits;

#[cfg(test)]
mod tests;

pub use db::{init_db, DbState, SharedConnection, IN_MEMORY};
pub use group_repo::GroupRepository;
pub use item_repo::ItemRepository;
pub use list_repo::ListRepository;
pub use traits::{ListScoped, Patchable, Repository};
