use crate::router::JournalState;
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub state: Option<String>,
}

/// GET /auth/google/callback -> self-closing page relaying the outcome to the opener.
pub async fn google_oauth_callback(
    State(state): State<JournalState>,
    Query(query): Query<AuthCallbackQuery>,
) -> Html<String> {
    let page = state
        .flow
        .relay_callback(
            query.code.as_deref(),
            query.error.as_deref(),
            query.state.as_deref(),
        )
        .await;
    Html(page)
}
