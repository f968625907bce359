use super::endpoints::{GoogleOauthEndpoints, grant_from_response};
use super::{NowProvider, system_now};
use crate::db::{Credential, CredentialStore};
use crate::error::{IsRetryable, JournalError};

use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use oauth2::RefreshToken;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An access token that was valid when handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Whether the provider was contacted to mint it.
    pub refreshed: bool,
}

/// Lazily refreshes expired credentials, just in time for the request that needs them.
#[derive(Clone)]
pub struct TokenRefreshManager {
    endpoints: GoogleOauthEndpoints,
    store: CredentialStore,
    skew_secs: i64,
    retry_policy: ExponentialBuilder,
    now: NowProvider,
}

impl TokenRefreshManager {
    pub fn new(
        endpoints: GoogleOauthEndpoints,
        store: CredentialStore,
        skew_secs: i64,
        retry_times: usize,
    ) -> Self {
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3))
            .with_max_times(retry_times)
            .with_jitter();
        Self {
            endpoints,
            store,
            skew_secs,
            retry_policy,
            now: system_now(),
        }
    }

    pub fn with_now_provider(mut self, now: NowProvider) -> Self {
        self.now = now;
        self
    }

    /// Return a token that is valid right now, refreshing and persisting if needed.
    ///
    /// A still-valid credential costs no network call. Without a refresh
    /// token, or when the provider rejects the refresh, the stored row is
    /// left exactly as it was.
    pub async fn ensure_valid_access_token(
        &self,
        credential: &Credential,
    ) -> Result<ValidAccessToken, JournalError> {
        let now = (self.now)();
        if credential.is_valid_at(now, self.skew_secs) {
            return Ok(ValidAccessToken {
                access_token: credential.access_token.clone(),
                expires_at: credential.expires_at,
                refreshed: false,
            });
        }

        let Some(refresh_token) = credential.refresh_token.clone() else {
            warn!(
                user_id = %credential.user_id,
                "access token expired and no refresh token is stored"
            );
            return Err(JournalError::MissingRefreshToken);
        };

        debug!(user_id = %credential.user_id, expires_at = %credential.expires_at, "refreshing access token");
        let token = RefreshToken::new(refresh_token.clone());
        let response = (|| async { self.endpoints.refresh_access_token(&token).await })
            .retry(self.retry_policy)
            .when(|e: &JournalError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("token refresh retrying after error {}, sleeping {:?}", err, dur);
            })
            .await
            .inspect_err(|e| {
                warn!(user_id = %credential.user_id, error = %e, "token refresh failed");
            })?;

        let grant = grant_from_response(&response, (self.now)(), Some(refresh_token));
        let saved = self.store.update(&credential.user_id, &grant).await?;
        info!(user_id = %saved.user_id, expires_at = %saved.expires_at, "access token refreshed");

        Ok(ValidAccessToken {
            access_token: saved.access_token,
            expires_at: saved.expires_at,
            refreshed: true,
        })
    }
}
