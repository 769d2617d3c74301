//! Shared test harness: an app wired to in-memory SQLite, an in-memory
//! session store and job queue, and a temp directory for blobs.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use stashd::config::Config;
use stashd::store::{MemoryJobQueue, MemorySessionStore};
use stashd::{db, AppState};

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub queue: Arc<MemoryJobQueue>,
    _blob_dir: TempDir,
}

pub async fn setup_test_app() -> TestApp {
    let blob_dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.storage.folder_path = blob_dir.path().join("blobs");

    let db = db::init_in_memory().await.unwrap();
    let sessions = Arc::new(MemorySessionStore::new());
    let queue = Arc::new(MemoryJobQueue::new());

    let state = Arc::new(AppState::new(config, db, sessions, queue.clone()));
    let router = stashd::api::create_router(state.clone());

    TestApp {
        router,
        state,
        queue,
        _blob_dir: blob_dir,
    }
}

/// Send a request and return (status, parsed JSON body).
pub async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .header("X-Token", token)
        .body(Body::empty())
        .unwrap()
}

pub fn put_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("PUT")
        .header("X-Token", token)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header("X-Token", token);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Register a user and return their id.
pub async fn create_user(app: &TestApp, email: &str, password: &str) -> String {
    let (status, body) = send_json(
        &app.router,
        post_json(
            "/users",
            None,
            &serde_json::json!({"email": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

/// Log in via Basic credentials and return the session token.
pub async fn connect(app: &TestApp, email: &str, password: &str) -> String {
    let encoded = BASE64.encode(format!("{email}:{password}"));
    let request = Request::builder()
        .uri("/connect")
        .method("GET")
        .header("Authorization", format!("Basic {encoded}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Upload helper. Returns the created record as JSON.
pub async fn upload(app: &TestApp, token: &str, body: Value) -> Value {
    let (status, body) = send_json(&app.router, post_json("/files", Some(token), &body)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

pub fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}
