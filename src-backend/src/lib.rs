//! Noto Backend
//!
//! Local, SQLite-backed datastore for the Noto client core.
//!
//! Layered architecture:
//! - domain: Entity identity and errors
//! - repository: Data access abstractions and SQLite implementations
//! - realtime: Change fan-out to list subscriptions
//! - datastore: The client datastore seam served from the repositories

pub mod config;
pub mod datastore;
pub mod domain;
pub mod realtime;
pub mod repository;

use std::sync::Arc;

pub use config::{BackendConfig, ConfigError};
pub use datastore::LocalDatastore;

use domain::DomainResult;
use realtime::RealtimeHub;
use repository::{init_db, DbState};

/// Application state shared by every command
pub struct AppState {
    pub db_state: DbState,
    pub datastore: Arc<LocalDatastore>,
    pub config: BackendConfig,
}

impl AppState {
    /// Open the database and wire the datastore to a fresh change feed
    pub async fn init(config: BackendConfig) -> DomainResult<Self> {
        let db_state = init_db(&config.database_path).await?;
        let hub = RealtimeHub::new(config.feed_capacity);
        let datastore = Arc::new(LocalDatastore::new(&db_state, hub));

        Ok(Self {
            db_state,
            datastore,
            config,
        })
    }

    /// Link to a list on the configured origin
    pub fn share_url(&self, list_id: uuid::Uuid) -> String {
        noto::share::share_url(&self.config.base_url, list_id)
    }
}
