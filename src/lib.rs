pub mod api;
pub mod config;
pub mod db;
pub mod storage;
pub mod store;
pub mod worker;

pub use db::DbPool;

use std::sync::Arc;

use config::Config;
use storage::BlobStore;
use store::{JobQueue, SessionStore};

/// Shared state handed to every request handler.
///
/// Store handles are created once at startup and passed explicitly; nothing
/// here is reachable as a global.
pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub sessions: Arc<dyn SessionStore>,
    pub queue: Arc<dyn JobQueue>,
    pub blobs: BlobStore,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        sessions: Arc<dyn SessionStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let blobs = BlobStore::new(config.storage.folder_path.clone());
        Self {
            config,
            db,
            sessions,
            queue,
            blobs,
        }
    }
}
