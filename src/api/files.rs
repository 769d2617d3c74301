//! File upload, listing, retrieval and visibility toggling.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::SessionUser;
use crate::api::error::ApiError;
use crate::db::{FileRecord, FileResponse, FileType};
use crate::store::ThumbnailTask;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<serde_json::Value>,
    #[serde(default)]
    pub is_public: bool,
    /// Base64-encoded content, required for non-folders.
    #[serde(default)]
    pub data: Option<String>,
}

/// The `parentId` field accepts the number 0 (root) or a record id string.
enum ParentRef {
    Root,
    Id(String),
    Invalid,
}

fn parse_parent(value: Option<&serde_json::Value>) -> ParentRef {
    match value {
        None => ParentRef::Root,
        Some(serde_json::Value::Number(n)) if n.as_i64() == Some(0) => ParentRef::Root,
        Some(serde_json::Value::String(s)) if s.is_empty() || s == "0" => ParentRef::Root,
        Some(serde_json::Value::String(s)) => ParentRef::Id(s.clone()),
        Some(_) => ParentRef::Invalid,
    }
}

/// Upload a folder, file or image
///
/// POST /files
pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let name = match request.name.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ApiError::bad_request("Missing name")),
    };
    let file_type = request
        .file_type
        .as_deref()
        .and_then(FileType::parse)
        .ok_or_else(|| ApiError::bad_request("Missing type"))?;

    let data = if file_type == FileType::Folder {
        None
    } else {
        let encoded = request
            .data
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Missing data"))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| ApiError::bad_request("Missing data"))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Missing data"));
        }
        Some(bytes)
    };

    let parent_id = match parse_parent(request.parent_id.as_ref()) {
        ParentRef::Root => None,
        ParentRef::Invalid => return Err(ApiError::bad_request("Parent not found")),
        ParentRef::Id(id) => {
            let parent = FileRecord::find_by_id(&state.db, &id)
                .await?
                .ok_or_else(|| ApiError::bad_request("Parent not found"))?;
            if parent.file_type != FileType::Folder {
                return Err(ApiError::bad_request("Parent is not a folder"));
            }
            Some(parent.id)
        }
    };

    let local_path = match &data {
        // Blob first, metadata second; the insert failure path below
        // compensates by deleting the blob again.
        Some(bytes) => Some(state.blobs.write_new(bytes).await?),
        None => None,
    };

    let record = FileRecord::new(
        &session.user_id,
        name,
        file_type,
        request.is_public,
        parent_id,
        local_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
    );

    if let Err(e) = record.insert(&state.db).await {
        if let Some(path) = &local_path {
            state.blobs.remove(path).await;
        }
        return Err(e.into());
    }

    if record.file_type == FileType::Image {
        let task = ThumbnailTask {
            file_id: record.id.clone(),
            user_id: record.user_id.clone(),
        };
        // Upload is already durable; a queue hiccup only costs thumbnails.
        if let Err(e) = state.queue.enqueue(&task).await {
            tracing::warn!(file = %record.id, error = %e, "Failed to enqueue thumbnail job");
        }
    }

    tracing::info!(
        file = %record.id,
        kind = record.file_type.as_str(),
        owner = %record.user_id,
        "File created"
    );

    Ok((StatusCode::CREATED, Json(FileResponse::from(record))))
}

fn valid_id(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

/// Fetch a single record owned by the caller
///
/// GET /files/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    if !valid_id(&id) {
        return Err(ApiError::not_found());
    }
    let record = FileRecord::find_by_id_and_owner(&state.db, &id, &session.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(FileResponse::from(record)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
}

/// List the caller's records under a parent, 20 per page
///
/// GET /files
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let parent_id = query
        .parent_id
        .as_deref()
        .filter(|p| !p.is_empty() && *p != "0");
    let page = query.page.unwrap_or(0);

    let records = FileRecord::list_page(&state.db, &session.user_id, parent_id, page).await?;
    Ok(Json(records.into_iter().map(FileResponse::from).collect()))
}

/// PUT /files/:id/publish
pub async fn publish(
    state: State<Arc<AppState>>,
    session: SessionUser,
    id: Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    set_visibility(state, session, id, true).await
}

/// PUT /files/:id/unpublish
pub async fn unpublish(
    state: State<Arc<AppState>>,
    session: SessionUser,
    id: Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    set_visibility(state, session, id, false).await
}

/// Ownership is enforced here: toggling someone else's file 404s rather than
/// revealing that the record exists.
async fn set_visibility(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
    Path(id): Path<String>,
    is_public: bool,
) -> Result<Json<FileResponse>, ApiError> {
    FileRecord::find_by_id_and_owner(&state.db, &id, &session.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    let updated = FileRecord::set_public(&state.db, &id, is_public)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(FileResponse::from(updated)))
}

/// Stream a file's content. Public files are readable by anyone; private
/// files only by their owner, and the difference is never observable from
/// the outside.
///
/// GET /files/:id/data
pub async fn download(
    State(state): State<Arc<AppState>>,
    session: Option<SessionUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    if !valid_id(&id) {
        return Err(ApiError::not_found());
    }
    let record = FileRecord::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if !record.is_public {
        let owner = session
            .as_ref()
            .map(|s| s.user_id == record.user_id)
            .unwrap_or(false);
        if !owner {
            return Err(ApiError::not_found());
        }
    }

    if record.file_type == FileType::Folder {
        return Err(ApiError::bad_request("A folder doesn't have content"));
    }

    let path = record
        .local_path
        .as_deref()
        .map(std::path::Path::new)
        .ok_or_else(ApiError::not_found)?;
    if !state.blobs.exists(path).await {
        return Err(ApiError::not_found());
    }
    let bytes = state.blobs.read(path).await?;

    // Content type comes from the human-readable name, not the blob path.
    let mime = mime_guess::from_path(&record.name).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response())
}
