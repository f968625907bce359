use crate::config::GoogleConfig;
use crate::db::TokenGrant;
use crate::error::JournalError;

use chrono::{DateTime, Duration, Utc};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
};
use tracing::{debug, info};
use url::Url;

pub(crate) type GoogleTokenResponse = BasicTokenResponse;

type GoogleOauth2Client =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Google OAuth endpoints bound to one client registration.
///
/// Client credentials travel in the form body, matching what the token
/// endpoint documents for web applications.
#[derive(Clone)]
pub struct GoogleOauthEndpoints {
    client: GoogleOauth2Client,
    http_client: reqwest::Client,
    scopes: Vec<String>,
}

impl GoogleOauthEndpoints {
    pub fn new(cfg: &GoogleConfig, http_client: reqwest::Client) -> Result<Self, JournalError> {
        if cfg.scopes.is_empty() {
            return Err(JournalError::InvalidRequest(
                "at least one calendar scope is required".to_string(),
            ));
        }
        let client = BasicClient::new(ClientId::new(cfg.client_id.clone()))
            .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(cfg.auth_url.clone())?)
            .set_token_uri(TokenUrl::new(cfg.token_url.clone())?)
            .set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.clone())?)
            .set_auth_type(AuthType::RequestBody);
        Ok(Self {
            client,
            http_client,
            scopes: cfg.scopes.clone(),
        })
    }

    /// Consent URL that forces an offline grant (refresh token) on every run.
    pub fn build_authorize_url(&self, state: CsrfToken) -> Url {
        let (url, _state) = self
            .client
            .authorize_url(|| state)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();
        url
    }

    pub async fn exchange_authorization_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<GoogleTokenResponse, JournalError> {
        let token_result = self
            .client
            .exchange_code(code)
            .request_async(&self.http_client)
            .await?;
        info!("Authorization code exchanged successfully");
        Ok(token_result)
    }

    pub async fn refresh_access_token(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<GoogleTokenResponse, JournalError> {
        let token_result = self
            .client
            .exchange_refresh_token(refresh_token)
            .request_async(&self.http_client)
            .await?;
        debug!("Access token refreshed successfully");
        Ok(token_result)
    }
}

/// Turn a token endpoint answer into storable token material.
///
/// `expires_at = now + expires_in`; a missing `expires_in` yields an already
/// expired token. The refresh token falls back to `previous` when the
/// provider did not issue a new one.
pub(crate) fn grant_from_response(
    response: &GoogleTokenResponse,
    now: DateTime<Utc>,
    previous_refresh_token: Option<String>,
) -> TokenGrant {
    let expires_in = response
        .expires_in()
        .and_then(|d| Duration::from_std(d).ok())
        .unwrap_or_else(Duration::zero);
    TokenGrant {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh_token),
        expires_at: now + expires_in,
    }
}
