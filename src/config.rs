use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use url::Url;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Service configuration.
///
/// Loaded from serialized defaults overridden by `JOURNAL_*` environment
/// variables; nested keys use a double underscore, e.g.
/// `JOURNAL_GOOGLE__CLIENT_SECRET`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub google: GoogleConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub loglevel: String,
    /// Shared key the function gateway presents on every call.
    pub api_key: String,
    /// Origin of the journal web app; used when a connect request names none.
    pub public_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub calendar_api_base: String,
    pub calendar_id: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds subtracted from `expires_at` before a token counts as expired.
    pub expiry_skew_secs: i64,
    pub authorization_timeout_secs: u64,
    /// Extra refresh attempts after a transport failure. `0` keeps refresh to
    /// a single provider call per request.
    pub refresh_retry_times: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub event_annotation: String,
    pub important_marker: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:journal-calendar.sqlite".to_string(),
            database_max_connections: 5,
            loglevel: "info".to_string(),
            api_key: "change-me".to_string(),
            public_origin: "http://localhost:5173".to_string(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:5173/auth/google/callback".to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            calendar_api_base: GOOGLE_CALENDAR_API_BASE.to_string(),
            calendar_id: "primary".to_string(),
            scopes: vec![
                CALENDAR_EVENTS_SCOPE.to_string(),
                CALENDAR_READONLY_SCOPE.to_string(),
            ],
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            expiry_skew_secs: 0,
            authorization_timeout_secs: 300,
            refresh_retry_times: 0,
            connect_timeout_secs: 5,
            request_timeout_secs: 15,
            event_annotation: "Task from your journal".to_string(),
            important_marker: "⭐ Important".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("JOURNAL_").split("__"))
            .extract()
            .map_err(Box::new)
    }
}

impl GoogleConfig {
    /// Origin of the page the provider redirects the popup to.
    pub fn redirect_origin(&self) -> Result<String, url::ParseError> {
        let url = Url::parse(&self.redirect_uri)?;
        Ok(url.origin().ascii_serialization())
    }
}
