//! Session store and thumbnail job queue.
//!
//! Both concerns live in the key-value store in production (Redis) and in
//! process memory in tests. Handlers and the worker only ever see the traits.

mod memory;
mod redis;

pub use self::memory::{MemoryJobQueue, MemorySessionStore};
pub use self::redis::{RedisJobQueue, RedisSessionStore};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("malformed queue payload: {0}")]
    Payload(String),
}

/// Maps opaque session tokens to user ids, with expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `token -> user_id` for `ttl`.
    async fn create(&self, token: &str, user_id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Resolve a token. `None` if unknown or expired.
    async fn get(&self, token: &str) -> Result<Option<String>, StoreError>;

    /// Delete a session. `true` if it existed.
    async fn delete(&self, token: &str) -> Result<bool, StoreError>;

    /// Liveness probe for the status endpoint.
    async fn ping(&self) -> bool;
}

/// A queued thumbnail task, produced on image upload and consumed by the
/// worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailTask {
    pub file_id: String,
    pub user_id: String,
}

/// FIFO queue of thumbnail tasks shared between the server and the worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, task: &ThumbnailTask) -> Result<(), StoreError>;

    /// Wait up to `timeout` for the next task. `None` on timeout.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<ThumbnailTask>, StoreError>;
}
