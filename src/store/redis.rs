//! Redis-backed store implementations.
//!
//! Sessions are plain string keys with a TTL; the job queue is a Redis list
//! (LPUSH by the server, BRPOP by the worker) carrying JSON payloads.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use super::{JobQueue, SessionStore, StoreError, ThumbnailTask};

const SESSION_PREFIX: &str = "auth_";
const QUEUE_KEY: &str = "stashd:thumbnail_jobs";

fn build_pool(url: &str) -> Result<Pool, StoreError> {
    let cfg = Config::from_url(url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| StoreError::Connection(e.to_string()))
}

async fn conn(pool: &Pool) -> Result<deadpool_redis::Connection, StoreError> {
    pool.get()
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))
}

pub struct RedisSessionStore {
    pool: Pool,
}

impl RedisSessionStore {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            pool: build_pool(url)?,
        })
    }

    fn key(token: &str) -> String {
        format!("{SESSION_PREFIX}{token}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, token: &str, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = conn(&self.pool).await?;
        let () = conn
            .set_ex(Self::key(token), user_id, ttl.as_secs())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<String>, StoreError> {
        let mut conn = conn(&self.pool).await?;
        conn.get(Self::key(token))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let mut conn = conn(&self.pool).await?;
        let deleted: i64 = conn
            .del(Self::key(token))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> bool {
        match conn(&self.pool).await {
            Ok(mut conn) => {
                let probe: Result<Option<String>, _> = conn.get("stashd:ping").await;
                probe.is_ok()
            }
            Err(_) => false,
        }
    }
}

pub struct RedisJobQueue {
    pool: Pool,
}

impl RedisJobQueue {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            pool: build_pool(url)?,
        })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, task: &ThumbnailTask) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(task).map_err(|e| StoreError::Payload(e.to_string()))?;
        let mut conn = conn(&self.pool).await?;
        let () = conn
            .lpush(QUEUE_KEY, payload)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<ThumbnailTask>, StoreError> {
        let mut conn = conn(&self.pool).await?;
        let popped: Option<(String, String)> = conn
            .brpop(QUEUE_KEY, timeout.as_secs_f64())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match popped {
            Some((_, payload)) => {
                let task = serde_json::from_str(&payload)
                    .map_err(|e| StoreError::Payload(e.to_string()))?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }
}
