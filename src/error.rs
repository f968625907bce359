use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum JournalError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server {
        error: String,
        description: Option<String>,
    },

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Authorization attempt was cancelled")]
    AuthorizationCancelled,

    #[error("Unknown authorization attempt")]
    UnknownAttempt,

    #[error("No calendar credential stored for this user")]
    CredentialNotFound,

    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Access token expired and no refresh token is stored")]
    MissingRefreshToken,

    #[error("Calendar API error with status {status}")]
    CalendarApi { status: StatusCode, body: String },

    #[error("Calendar API response did not include an event id")]
    MissingEventId,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Ractor error: {0}")]
    RactorError(String),
}

/// Errors worth another attempt: the request never got a provider answer.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for JournalError {
    fn is_retryable(&self) -> bool {
        match self {
            JournalError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            JournalError::Oauth2Token(_) => true,
            _ => false,
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for JournalError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => JournalError::Oauth2Server {
                error: err.error().to_string(),
                description: err.error_description().cloned(),
            },
            RequestTokenError::Request(req_e) => {
                JournalError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                JournalError::Json(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => JournalError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for JournalError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            JournalError::AuthorizationFailed(reason) => (
                StatusCode::BAD_REQUEST,
                "AUTHORIZATION_FAILED",
                format!("Calendar authorization failed: {reason}"),
            ),
            JournalError::Oauth2Server { error, .. } => (
                StatusCode::BAD_REQUEST,
                "AUTHORIZATION_FAILED",
                format!("Calendar provider rejected the request: {error}"),
            ),
            JournalError::AuthorizationCancelled => (
                StatusCode::CONFLICT,
                "AUTHORIZATION_CANCELLED",
                "The authorization window was closed before completion.".to_string(),
            ),
            JournalError::UnknownAttempt => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_ATTEMPT",
                "No pending authorization matches this request.".to_string(),
            ),
            JournalError::CredentialNotFound => (
                StatusCode::NOT_FOUND,
                "NOT_CONNECTED",
                "No calendar is connected.".to_string(),
            ),
            JournalError::TaskNotFound(id) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Task {id} does not exist."),
            ),
            JournalError::InvalidRequest(reason) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", reason.clone())
            }
            JournalError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "invalid or missing key".to_string(),
            ),
            JournalError::Reqwest(_)
            | JournalError::Oauth2Token(_)
            | JournalError::CalendarApi { .. }
            | JournalError::MissingEventId
            | JournalError::MissingRefreshToken => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Calendar provider is unavailable.".to_string(),
            ),
            JournalError::UrlParse(_)
            | JournalError::Json(_)
            | JournalError::DatabaseError(_)
            | JournalError::RactorError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
