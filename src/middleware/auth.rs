use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use subtle::ConstantTimeEq;

use crate::error::JournalError;
use crate::router::JournalState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the service key.
/// Accepts either:
/// - Header: `x-api-key: ...`
/// - Header: `Authorization: Bearer ...`
/// - Query string: `?key=...`
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<(), JournalError> {
    if let Some(hv) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
        && key_matches(hv.trim(), expected)
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && key_matches(token.trim(), expected)
        {
            return Ok(());
        }
    }

    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && key_matches(&v, expected) {
                return Ok(());
            }
        }
    }

    Err(JournalError::Unauthorized)
}

/// Authenticated caller: the gateway presented the service key and named the user.
#[derive(Debug, Clone)]
pub struct RequireUser(pub String);

impl FromRequestParts<JournalState> for RequireUser {
    type Rejection = JournalError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &JournalState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, parts.uri.query(), &state.api_key)?;

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(JournalError::Unauthorized)?;
        Ok(Self(user_id.to_string()))
    }
}
