use super::endpoints::{GoogleOauthEndpoints, grant_from_response};
use super::{NowProvider, system_now};
use crate::db::{Credential, CredentialStore};
use crate::error::JournalError;
use crate::service::authorization_broker::{AuthorizationBroker, Delivery};
use crate::service::connection::ConnectionNotifier;
use crate::types::popup::{
    AuthorizationOutcome, PopupMessage, normalize_origin, render_relay_page,
};

use oauth2::{AuthorizationCode, CsrfToken};
use serde::Serialize;
use tracing::{info, warn};

/// Returned to the opener so it can open the consent popup.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationStart {
    pub attempt_id: String,
    pub authorization_url: String,
}

/// Drives the three-legged consent handshake and owns first-time credential writes.
#[derive(Clone)]
pub struct AuthorizationFlow {
    endpoints: GoogleOauthEndpoints,
    store: CredentialStore,
    broker: AuthorizationBroker,
    notifier: ConnectionNotifier,
    /// Origin the relay page is served from; the sender of every popup message.
    redirect_origin: String,
    now: NowProvider,
}

impl AuthorizationFlow {
    pub fn new(
        endpoints: GoogleOauthEndpoints,
        store: CredentialStore,
        broker: AuthorizationBroker,
        notifier: ConnectionNotifier,
        redirect_origin: String,
    ) -> Self {
        Self {
            endpoints,
            store,
            broker,
            notifier,
            redirect_origin,
            now: system_now(),
        }
    }

    pub fn with_now_provider(mut self, now: NowProvider) -> Self {
        self.now = now;
        self
    }

    /// Register a pending attempt and build its consent URL.
    ///
    /// The attempt id doubles as the OAuth `state` parameter, so the redirect
    /// can be paired back to the opener that started it.
    pub fn begin_authorization(
        &self,
        user_id: &str,
        callback_origin: &str,
    ) -> Result<AuthorizationStart, JournalError> {
        let opener_origin = normalize_origin(callback_origin).ok_or_else(|| {
            JournalError::InvalidRequest(format!("invalid callback origin: {callback_origin}"))
        })?;
        let state = CsrfToken::new_random();
        let attempt_id = state.secret().clone();
        self.broker.register(&attempt_id, user_id, &opener_origin)?;

        let authorization_url = self.endpoints.build_authorize_url(state);
        info!(user_id, attempt_id, opener_origin, "calendar authorization started");
        Ok(AuthorizationStart {
            attempt_id,
            authorization_url: authorization_url.to_string(),
        })
    }

    /// Handle the provider redirect and render the self-closing relay page.
    ///
    /// The page only targets the opener when the attempt is known and the
    /// relay origin matches it; otherwise it just closes.
    pub async fn relay_callback(
        &self,
        code: Option<&str>,
        error: Option<&str>,
        state: Option<&str>,
    ) -> String {
        let message = PopupMessage::from_redirect(code, error);
        let target = match state {
            Some(attempt_id) => match self
                .broker
                .deliver(attempt_id, &self.redirect_origin, message.clone())
                .await
            {
                Ok(Delivery::Accepted { opener_origin }) => Some(opener_origin),
                Ok(Delivery::OriginMismatch { .. }) | Ok(Delivery::UnknownAttempt) => None,
                Err(e) => {
                    warn!(attempt_id, error = %e, "failed to relay authorization callback");
                    None
                }
            },
            None => {
                warn!("authorization callback without state");
                None
            }
        };
        render_relay_page(&message, target.as_deref())
    }

    /// Wait for the popup of `attempt_id`, then finish the exchange.
    pub async fn await_authorization(
        &self,
        user_id: &str,
        attempt_id: &str,
    ) -> Result<Credential, JournalError> {
        match self.broker.await_outcome(attempt_id, user_id).await? {
            AuthorizationOutcome::Code(code) => self.complete_authorization(user_id, &code).await,
            AuthorizationOutcome::Denied(reason) => {
                info!(user_id, attempt_id, reason, "calendar authorization denied");
                Err(JournalError::AuthorizationFailed(reason))
            }
            AuthorizationOutcome::Cancelled => {
                info!(user_id, attempt_id, "calendar authorization cancelled");
                Err(JournalError::AuthorizationCancelled)
            }
        }
    }

    /// The opener saw its popup close without a message.
    pub fn abandon_authorization(&self, user_id: &str, attempt_id: &str) {
        self.broker.abandon(attempt_id, user_id);
    }

    /// Exchange `code` server-side and upsert the user's credential.
    ///
    /// Nothing is written unless the exchange succeeds.
    pub async fn complete_authorization(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<Credential, JournalError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(JournalError::InvalidRequest(
                "authorization code is required".to_string(),
            ));
        }

        let response = self
            .endpoints
            .exchange_authorization_code(AuthorizationCode::new(code.to_string()))
            .await
            .map_err(|e| {
                warn!(user_id, error = %e, "authorization code exchange failed");
                match e {
                    JournalError::Oauth2Server { .. } => e,
                    other => JournalError::AuthorizationFailed(other.to_string()),
                }
            })?;

        let grant = grant_from_response(&response, (self.now)(), None);
        if grant.refresh_token.is_none() {
            warn!(user_id, "provider issued no refresh token; credential cannot be refreshed");
        }
        let credential = self.store.upsert(user_id, &grant).await?;
        self.notifier.publish(user_id, true);
        info!(user_id, expires_at = %credential.expires_at, "calendar connected");
        Ok(credential)
    }

    /// Forget the user's credential. Returns whether one existed.
    pub async fn disconnect(&self, user_id: &str) -> Result<bool, JournalError> {
        let removed = self.store.delete(user_id).await?;
        self.notifier.publish(user_id, false);
        info!(user_id, removed, "calendar disconnected");
        Ok(removed)
    }
}
