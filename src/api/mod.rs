pub mod auth;
pub mod error;
mod files;
mod users;

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/users", post(users::create_user))
        .route("/users/me", get(users::get_me))
        .route("/connect", get(auth::connect))
        .route("/disconnect", get(auth::disconnect))
        .route("/files", post(files::upload))
        .route("/files", get(files::index))
        .route("/files/:id", get(files::show))
        .route("/files/:id/publish", put(files::publish))
        .route("/files/:id/unpublish", put(files::unpublish))
        .route("/files/:id/data", get(files::download))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct StatusResponse {
    redis: bool,
    db: bool,
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let db = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let redis = state.sessions.ping().await;
    Json(StatusResponse { redis, db })
}

#[derive(Serialize)]
struct StatsResponse {
    users: i64,
    files: i64,
}

/// GET /stats
async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, error::ApiError> {
    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    let (files,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
        .fetch_one(&state.db)
        .await?;
    Ok(Json(StatsResponse { users, files }))
}
