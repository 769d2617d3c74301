//! Login, logout and session resolution.
//!
//! Login takes Basic credentials and trades them for an opaque UUID token in
//! the session store; every protected endpoint resolves that token through
//! the [`SessionUser`] extractor before doing anything else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::api::error::ApiError;
use crate::db::User;
use crate::AppState;

pub const TOKEN_HEADER: &str = "X-Token";

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub token: String,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Pull `email:password` out of a Basic Authorization header. Empty email or
/// password counts as absent credentials.
fn decode_basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some((email.to_string(), password.to_string()))
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
}

/// Login endpoint
///
/// GET /connect
pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ConnectResponse>, ApiError> {
    let (email, password) =
        decode_basic_credentials(&headers).ok_or_else(ApiError::unauthorized)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::unauthorized());
    }

    let token = uuid::Uuid::new_v4().to_string();
    let ttl = Duration::from_secs(state.config.redis.session_ttl_secs);
    state.sessions.create(&token, &user.id, ttl).await?;

    tracing::info!(user = %user.email, "Session opened");

    Ok(Json(ConnectResponse { token }))
}

/// Logout endpoint. Deleting an already-deleted session fails; absence is
/// indistinguishable from never having been logged in.
///
/// GET /disconnect
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(&headers).ok_or_else(ApiError::unauthorized)?;

    if state.sessions.get(&token).await?.is_none() {
        return Err(ApiError::unauthorized());
    }
    state.sessions.delete(&token).await?;

    Ok(StatusCode::OK)
}

/// The authenticated caller, resolved from the `X-Token` header.
///
/// A missing header and an unknown or expired token both reject with 401,
/// before any other request validation runs.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let user_id = state
            .sessions
            .get(&token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;
        Ok(SessionUser { user_id, token })
    }
}
