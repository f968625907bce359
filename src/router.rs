use crate::api::CalendarApi;
use crate::config::Config;
use crate::db::{self, CredentialStore, SqlitePool, TaskStore};
use crate::error::JournalError;
use crate::google_oauth::{AuthorizationFlow, GoogleOauthEndpoints, TokenRefreshManager};
use crate::handlers::{calendar, google_oauth, tasks};
use crate::service::{AuthorizationBroker, ConnectionNotifier, EventSyncExecutor, TaskSyncService};

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared handler state; every field is a cheap clone.
#[derive(Clone)]
pub struct JournalState {
    pub flow: AuthorizationFlow,
    pub notifier: ConnectionNotifier,
    pub task_sync: TaskSyncService,
    pub tasks: TaskStore,
    pub public_origin: Arc<str>,
    pub api_key: Arc<str>,
}

impl JournalState {
    /// Connect the database and wire every component from `cfg`.
    pub async fn from_config(cfg: &Config) -> Result<Self, JournalError> {
        let pool = db::connect(&cfg.basic.database_url, cfg.basic.database_max_connections).await?;
        Self::with_pool(cfg, pool).await
    }

    pub async fn with_pool(cfg: &Config, pool: SqlitePool) -> Result<Self, JournalError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("journal-calendar/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.sync.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.sync.request_timeout_secs))
            // token endpoints must not follow redirects
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let credentials = CredentialStore::new(pool.clone());
        let tasks = TaskStore::new(pool);
        let endpoints = GoogleOauthEndpoints::new(&cfg.google, client.clone())?;
        let notifier = ConnectionNotifier::new(credentials.clone());
        let broker =
            AuthorizationBroker::spawn(Duration::from_secs(cfg.sync.authorization_timeout_secs))
                .await?;

        let flow = AuthorizationFlow::new(
            endpoints.clone(),
            credentials.clone(),
            broker,
            notifier.clone(),
            cfg.google.redirect_origin()?,
        );
        let refresher = TokenRefreshManager::new(
            endpoints,
            credentials.clone(),
            cfg.sync.expiry_skew_secs,
            cfg.sync.refresh_retry_times,
        );
        let calendar = CalendarApi::new(
            client,
            &cfg.google.calendar_api_base,
            &cfg.google.calendar_id,
        )?;
        let executor = EventSyncExecutor::new(
            calendar,
            cfg.sync.event_annotation.clone(),
            cfg.sync.important_marker.clone(),
        );
        let task_sync = TaskSyncService::new(tasks.clone(), credentials, refresher, executor);

        info!(
            calendar_id = %cfg.google.calendar_id,
            redirect_uri = %cfg.google.redirect_uri,
            "journal state initialised"
        );
        Ok(Self {
            flow,
            notifier,
            task_sync,
            tasks,
            public_origin: Arc::from(cfg.basic.public_origin.as_str()),
            api_key: Arc::from(cfg.basic.api_key.as_str()),
        })
    }
}

pub fn journal_router(state: JournalState) -> Router {
    Router::new()
        .route("/calendar/connect", post(calendar::begin_connect))
        .route(
            "/calendar/connect/{attempt_id}",
            get(calendar::await_connect).delete(calendar::abandon_connect),
        )
        .route("/calendar/authorize", post(calendar::authorize))
        .route("/calendar/status", get(calendar::status))
        .route("/calendar/status/stream", get(calendar::status_stream))
        .route("/calendar/connection", delete(calendar::disconnect))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/auth/google/callback", get(google_oauth::google_oauth_callback))
        .with_state(state)
}
