use crate::db::CredentialStore;
use crate::error::JournalError;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CAPACITY: usize = 64;

/// A change of a user's "calendar connected" signal.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub user_id: String,
    pub connected: bool,
}

/// Answers "is a calendar credential on file?" and fans out changes.
///
/// Presence of the row is all that counts; token validity is checked at use time.
#[derive(Clone)]
pub struct ConnectionNotifier {
    store: CredentialStore,
    tx: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionNotifier {
    pub fn new(store: CredentialStore) -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { store, tx }
    }

    pub async fn is_connected(&self, user_id: &str) -> Result<bool, JournalError> {
        self.store.exists(user_id).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, user_id: &str, connected: bool) {
        // no subscribers is fine
        let receivers = self
            .tx
            .send(ConnectionEvent {
                user_id: user_id.to_string(),
                connected,
            })
            .unwrap_or(0);
        debug!(user_id, connected, receivers, "connection state published");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{TokenGrant, sqlite::memory_pool};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn presence_of_row_means_connected_even_when_expired() {
        let store = CredentialStore::new(memory_pool().await);
        let notifier = ConnectionNotifier::new(store.clone());
        assert!(!notifier.is_connected("u1").await.expect("status"));

        store
            .upsert(
                "u1",
                &TokenGrant {
                    access_token: "a".to_string(),
                    refresh_token: None,
                    expires_at: Utc::now() - Duration::days(30),
                },
            )
            .await
            .expect("seed");
        assert!(notifier.is_connected("u1").await.expect("status"));
        assert!(!notifier.is_connected("u2").await.expect("status"));
    }

    #[tokio::test]
    async fn subscribers_receive_changes() {
        let notifier = ConnectionNotifier::new(CredentialStore::new(memory_pool().await));
        let mut rx = notifier.subscribe();
        notifier.publish("u1", true);
        notifier.publish("u1", false);

        assert_eq!(
            rx.recv().await.expect("first"),
            ConnectionEvent {
                user_id: "u1".to_string(),
                connected: true
            }
        );
        assert!(!rx.recv().await.expect("second").connected);
    }
}
