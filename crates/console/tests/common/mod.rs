#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use cardkey_console::{ConsoleConfig, Navigator, Notifier};

pub const TOKEN: &str = "tok-1";
pub const PASSWORD: &str = "secret";

pub struct TestServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app()).await.unwrap();
        });

        Self { base_url, handle }
    }

    pub fn config(&self) -> ConsoleConfig {
        ConsoleConfig {
            api_base_url: self.base_url.clone(),
            session_dir: None,
            ..ConsoleConfig::default()
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn envelope(ret: &[&str], data: Value) -> Value {
    json!({"platform": "web", "api": "test", "data": data, "ret": ret, "v": 1})
}

fn app() -> Router {
    Router::new()
        .route("/ok", get(|| async { Json(envelope(&["SUCCESS::"], json!({"n": 1}))) }))
        .route(
            "/app-error",
            get(|| async { Json(envelope(&["CARD_EXPIRED::Card expired"], json!({}))) }),
        )
        .route(
            "/empty-ret",
            get(|| async { Json(json!({"data": {}, "ret": []})) }),
        )
        .route(
            "/plain-401",
            get(|| async { (StatusCode::UNAUTHORIZED, "nope") }),
        )
        .route(
            "/success-401",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(envelope(&["SUCCESS::"], json!({"stale": true}))),
                )
            }),
        )
        .route(
            "/error-401",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(envelope(&["TOKEN_EXPIRED::Token expired"], Value::Null)),
                )
            }),
        )
        .route(
            "/denied",
            get(|| async { (StatusCode::FORBIDDEN, Json(json!({"detail": "no"}))) }),
        )
        .route(
            "/detail-500",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "database down"})),
                )
            }),
        )
        .route("/bare-502", get(|| async { StatusCode::BAD_GATEWAY }))
        .route("/logo.png", get(logo))
        .route("/echo-auth", get(echo_auth))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/register", post(register))
        .route(
            "/auth/logout",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/app/public/list", get(public_apps))
}

async fn logo() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/png")],
        vec![0x89, b'P', b'N', b'G'],
    )
}

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(envelope(&["SUCCESS::"], json!({"authorization": auth})))
}

async fn login(Json(body): Json<Value>) -> Json<Value> {
    if body["password"] == PASSWORD {
        Json(envelope(
            &["SUCCESS::signed in"],
            json!({
                "token": TOKEN,
                "username": body["username"],
                "role": "admin",
                "user_status": "NORMAL",
                "has_card": true
            }),
        ))
    } else {
        Json(envelope(&["AUTH_FAILED::Invalid credentials"], Value::Null))
    }
}

async fn register(Json(body): Json<Value>) -> Json<Value> {
    match body["password"].as_str() {
        Some(password) if !password.is_empty() => Json(envelope(
            &["SUCCESS::registered"],
            json!({
                "id": 42,
                "username": body["username"],
                "role": "user",
                "status": "NORMAL",
                "created_at": "2024-02-02T00:00:00Z"
            }),
        )),
        _ => Json(envelope(&["PASSWORD_REQUIRED::Password is required"], Value::Null)),
    }
}

async fn me(headers: HeaderMap) -> axum::response::Response {
    let bearer = format!("Bearer {TOKEN}");
    match headers.get(header::AUTHORIZATION) {
        Some(v) if v.as_bytes() == bearer.as_bytes() => Json(envelope(
            &["SUCCESS::"],
            json!({
                "id": 7,
                "username": "alice",
                "role": "admin",
                "status": "normal",
                "created_at": "2024-01-01T00:00:00Z"
            }),
        ))
        .into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"}))).into_response(),
    }
}

async fn public_apps() -> Json<Value> {
    Json(envelope(
        &["SUCCESS::"],
        json!({"total": 1, "apps": [{"app_key": "demo", "app_name": "Demo App"}]}),
    ))
}

/// Captures forced navigations and notifications.
#[derive(Debug, Default)]
pub struct Recorder {
    navigations: Mutex<Vec<String>>,
    notices: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }
}

impl Navigator for Recorder {
    fn navigate(&self, path: &str) {
        self.navigations.lock().unwrap().push(path.to_string());
    }
}

impl Notifier for Recorder {
    fn error(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}
