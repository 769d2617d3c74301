//! File metadata records.
//!
//! A record describes either a folder or a stored file/image. Content bytes
//! live on disk at `local_path`; folders have no content and no path.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::DbPool;

pub const PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FileType {
    Folder,
    File,
    Image,
}

impl FileType {
    /// Parse a request-supplied type string. Unknown strings are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(FileType::Folder),
            "file" => Some(FileType::File),
            "image" => Some(FileType::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub file_type: FileType,
    pub is_public: bool,
    /// None = root. Otherwise the id of a folder record.
    pub parent_id: Option<String>,
    /// None iff `file_type` is a folder.
    pub local_path: Option<String>,
    pub created_at: String,
}

/// Wire representation of a file record. `parentId` serializes as `0` for
/// the root, or the parent's id string, matching the public API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        let parent_id = match record.parent_id {
            Some(id) => serde_json::Value::String(id),
            None => serde_json::Value::from(0),
        };
        Self {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            file_type: record.file_type,
            is_public: record.is_public,
            parent_id,
            local_path: record.local_path,
        }
    }
}

impl FileRecord {
    pub fn new(
        user_id: &str,
        name: &str,
        file_type: FileType,
        is_public: bool,
        parent_id: Option<String>,
        local_path: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            file_type,
            is_public,
            parent_id,
            local_path,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub async fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id_and_owner(
        pool: &DbPool,
        id: &str,
        user_id: &str,
    ) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM files WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(&self, pool: &DbPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO files (id, user_id, name, file_type, is_public, parent_id, local_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.user_id)
        .bind(&self.name)
        .bind(self.file_type)
        .bind(self.is_public)
        .bind(&self.parent_id)
        .bind(&self.local_path)
        .bind(&self.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List one page of an owner's records under a parent. Ordered by
    /// creation time then id so pagination is stable under concurrent inserts.
    pub async fn list_page(
        pool: &DbPool,
        user_id: &str,
        parent_id: Option<&str>,
        page: i64,
    ) -> Result<Vec<FileRecord>, sqlx::Error> {
        let offset = page.max(0) * PAGE_SIZE;
        match parent_id {
            Some(parent) => {
                sqlx::query_as(
                    "SELECT * FROM files WHERE user_id = ? AND parent_id = ?
                     ORDER BY created_at, id LIMIT ? OFFSET ?",
                )
                .bind(user_id)
                .bind(parent)
                .bind(PAGE_SIZE)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM files WHERE user_id = ? AND parent_id IS NULL
                     ORDER BY created_at, id LIMIT ? OFFSET ?",
                )
                .bind(user_id)
                .bind(PAGE_SIZE)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Flip visibility and return the updated record.
    pub async fn set_public(
        pool: &DbPool,
        id: &str,
        is_public: bool,
    ) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query("UPDATE files SET is_public = ? WHERE id = ?")
            .bind(is_public)
            .bind(id)
            .execute(pool)
            .await?;
        Self::find_by_id(pool, id).await
    }
}
