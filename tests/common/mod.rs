#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use chrono::{DateTime, Utc};
use journal_calendar::config::Config;
use journal_calendar::db::{self, Credential, CredentialStore, SqlitePool, TokenGrant};
use journal_calendar::{JournalState, journal_router};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use wiremock::MockServer;

pub const API_KEY: &str = "test-key";
pub const APP_ORIGIN: &str = "http://journal.test";
pub const USER: &str = "user-1";

pub struct TestApp {
    pub app: Router,
    pub provider: MockServer,
    pub pool: SqlitePool,
    pub credentials: CredentialStore,
    db_path: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_path);
    }
}

/// Router over a fresh SQLite file, with every provider URL pointed at a mock server.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Like [`spawn_app`], with a hook to adjust the configuration first.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let provider = MockServer::start().await;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut db_path = std::env::temp_dir();
    db_path.push(format!(
        "journal-calendar-test-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let database_url = format!("sqlite:{}", db_path.display());

    let mut cfg = Config::default();
    cfg.basic.api_key = API_KEY.to_string();
    cfg.basic.public_origin = APP_ORIGIN.to_string();
    cfg.google.client_id = "client-id".to_string();
    cfg.google.client_secret = "client-secret".to_string();
    cfg.google.redirect_uri = format!("{APP_ORIGIN}/auth/google/callback");
    cfg.google.token_url = format!("{}/token", provider.uri());
    cfg.google.calendar_api_base = provider.uri();
    cfg.sync.authorization_timeout_secs = 5;
    configure(&mut cfg);

    let pool = db::connect(&database_url, 2).await.expect("connect test db");
    let state = JournalState::with_pool(&cfg, pool.clone())
        .await
        .expect("build state");

    TestApp {
        app: journal_router(state),
        provider,
        credentials: CredentialStore::new(pool.clone()),
        pool,
        db_path,
    }
}

impl TestApp {
    pub async fn seed_credential(
        &self,
        access: &str,
        refresh: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Credential {
        self.credentials
            .upsert(
                USER,
                &TokenGrant {
                    access_token: access.to_string(),
                    refresh_token: refresh.map(str::to_string),
                    expires_at,
                },
            )
            .await
            .expect("seed credential")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let resp = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        read_json(resp).await
    }

    pub async fn send_text(&self, request: Request<Body>) -> (StatusCode, String) {
        let resp = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        (
            status,
            String::from_utf8(body.to_vec()).expect("response body was not utf-8"),
        )
    }
}

pub async fn read_json(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if body.is_empty() {
        return (status, Value::Null);
    }
    (
        status,
        serde_json::from_slice(&body).expect("response body was not json"),
    )
}

/// Authenticated request as `USER`.
pub fn user_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    user_request_as(USER, method, uri, body)
}

pub fn user_request_as(
    user: &str,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header("x-user-id", user);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("failed to build request"),
        None => builder.body(Body::empty()).expect("failed to build request"),
    }
}

pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = Value::String(refresh.to_string());
    }
    body
}
