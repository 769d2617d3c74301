//! In-memory store backends, used by tests and redis-less development runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{JobQueue, SessionStore, StoreError, ThumbnailTask};

#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, token: &str, user_id: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(token.to_string(), (user_id.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match entries.get(token) {
            Some((user_id, expires_at)) if *expires_at > Instant::now() => {
                Ok(Some(user_id.clone()))
            }
            Some(_) => {
                // Expired; drop it so the map does not grow forever.
                entries.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(entries.remove(token).is_some())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct MemoryJobQueue {
    tasks: Mutex<VecDeque<ThumbnailTask>>,
    notify: Arc<Notify>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, task: &ThumbnailTask) -> Result<(), StoreError> {
        self.tasks.lock().await.push_back(task.clone());
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<ThumbnailTask>, StoreError> {
        if let Some(task) = self.tasks.lock().await.pop_front() {
            return Ok(Some(task));
        }
        // Wait for a producer, then try once more.
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
        Ok(self.tasks.lock().await.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_round_trip_and_delete() {
        let store = MemorySessionStore::new();
        store
            .create("tok", "user-1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("tok").await.unwrap().as_deref(), Some("user-1"));

        assert!(store.delete("tok").await.unwrap());
        assert_eq!(store.get("tok").await.unwrap(), None);
        // Second delete reports absence.
        assert!(!store.delete("tok").await.unwrap());
    }

    #[tokio::test]
    async fn expired_sessions_resolve_to_none() {
        let store = MemorySessionStore::new();
        store
            .create("tok", "user-1", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let queue = MemoryJobQueue::new();
        for i in 0..3 {
            queue
                .enqueue(&ThumbnailTask {
                    file_id: format!("f{i}"),
                    user_id: "u".to_string(),
                })
                .await
                .unwrap();
        }
        for i in 0..3 {
            let task = queue
                .dequeue(Duration::from_millis(10))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(task.file_id, format!("f{i}"));
        }
        assert!(queue
            .dequeue(Duration::from_millis(10))
            .await
            .unwrap()
            .is_none());
    }
}
