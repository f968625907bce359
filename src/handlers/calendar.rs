use crate::error::JournalError;
use crate::google_oauth::AuthorizationStart;
use crate::middleware::auth::RequireUser;
use crate::router::JournalState;
use crate::service::ConnectionEvent;
use crate::types::popup::normalize_origin;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub callback_origin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectedResponse {
    pub connected: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub connected: bool,
    pub removed: bool,
}

fn header_origin(origin: &headers::Origin) -> Option<String> {
    if origin.is_null() {
        return None;
    }
    let raw = match origin.port() {
        Some(port) => format!("{}://{}:{}", origin.scheme(), origin.hostname(), port),
        None => format!("{}://{}", origin.scheme(), origin.hostname()),
    };
    normalize_origin(&raw)
}

/// POST /calendar/connect -> attempt id and consent URL for the popup.
pub async fn begin_connect(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
    origin: Option<TypedHeader<headers::Origin>>,
    Json(body): Json<ConnectRequest>,
) -> Result<Json<AuthorizationStart>, JournalError> {
    let callback_origin = body
        .callback_origin
        .or_else(|| origin.and_then(|TypedHeader(o)| header_origin(&o)))
        .unwrap_or_else(|| state.public_origin.to_string());
    let start = state.flow.begin_authorization(&user_id, &callback_origin)?;
    Ok(Json(start))
}

/// GET /calendar/connect/{attempt_id} -> waits for the popup, then completes the exchange.
pub async fn await_connect(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<ConnectedResponse>, JournalError> {
    let credential = state.flow.await_authorization(&user_id, &attempt_id).await?;
    Ok(Json(ConnectedResponse {
        connected: true,
        expires_at: credential.expires_at,
    }))
}

/// DELETE /calendar/connect/{attempt_id} -> the popup was closed.
pub async fn abandon_connect(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
    Path(attempt_id): Path<String>,
) -> StatusCode {
    state.flow.abandon_authorization(&user_id, &attempt_id);
    StatusCode::NO_CONTENT
}

/// POST /calendar/authorize -> exchange a code obtained out of band.
pub async fn authorize(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
    Json(body): Json<AuthorizeRequest>,
) -> Result<Json<ConnectedResponse>, JournalError> {
    let credential = state.flow.complete_authorization(&user_id, &body.code).await?;
    Ok(Json(ConnectedResponse {
        connected: true,
        expires_at: credential.expires_at,
    }))
}

pub async fn status(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<StatusResponse>, JournalError> {
    let connected = state.notifier.is_connected(&user_id).await?;
    Ok(Json(StatusResponse { connected }))
}

/// GET /calendar/status/stream -> current state, then every change for this user.
pub async fn status_stream(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, JournalError> {
    let rx = state.notifier.subscribe();
    let connected = state.notifier.is_connected(&user_id).await?;
    debug!(user_id, connected, "connection status stream opened");

    let current = tokio_stream::once(ConnectionEvent {
        user_id: user_id.clone(),
        connected,
    });
    let changes = BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(event) if event.user_id == user_id => Some(event),
        // lagged receivers just skip ahead
        _ => None,
    });
    let stream = current
        .chain(changes)
        .map(|event| Event::default().event("connection").json_data(&event));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// DELETE /calendar/connection -> forget the stored credential.
pub async fn disconnect(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<DisconnectResponse>, JournalError> {
    let removed = state.flow.disconnect(&user_id).await?;
    Ok(Json(DisconnectResponse {
        connected: false,
        removed,
    }))
}
