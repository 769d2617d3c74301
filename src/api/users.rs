//! User registration and the current-user endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::auth::{hash_password, SessionUser};
use crate::api::error::ApiError;
use crate::db::{User, UserResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Create a new user
///
/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = match request.email.as_deref() {
        Some(email) if !email.is_empty() => email,
        _ => return Err(ApiError::bad_request("Missing email")),
    };
    let password = match request.password.as_deref() {
        Some(password) if !password.is_empty() => password,
        _ => return Err(ApiError::bad_request("Missing password")),
    };

    if User::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::bad_request("Already exist"));
    }

    let password_hash =
        hash_password(password).map_err(|e| ApiError::internal(format!("Hashing failed: {e}")))?;
    let user = User::insert(&state.db, email, &password_hash).await?;

    tracing::info!(user = %user.email, "User created");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Return the authenticated user
///
/// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    session: SessionUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, &session.user_id)
        .await?
        .ok_or_else(ApiError::unauthorized)?;
    Ok(Json(UserResponse::from(user)))
}
