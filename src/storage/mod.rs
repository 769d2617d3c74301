//! On-disk blob storage.
//!
//! Blobs live under a single root directory on paths derived from random
//! identifiers, decoupled from user-supplied names to avoid collisions. The
//! metadata row owning a blob carries its absolute path.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write bytes to a fresh random path under the root, creating the root
    /// if needed. Returns the absolute path of the new blob.
    pub async fn write_new(&self, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(path).await?)
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Best-effort removal, used to compensate when a metadata write fails
    /// after its blob was already written.
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove orphaned blob");
        }
    }
}
