//! One-shot pairing of in-flight authorization attempts with popup messages.

use crate::error::JournalError;
use crate::types::popup::{AuthorizationOutcome, PopupMessage, accept_from};

use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How long an expired attempt keeps answering awaits with `Cancelled`.
const EXPIRED_RETENTION: Duration = Duration::from_secs(15 * 60);

/// Messages handled by the broker actor.
#[derive(Debug)]
pub enum BrokerMessage {
    /// Start tracking an attempt for `user_id`, opened from `opener_origin`.
    Register {
        attempt_id: String,
        user_id: String,
        opener_origin: String,
    },
    /// Wait for the attempt's outcome. `None` when no such attempt exists for this user.
    Await {
        attempt_id: String,
        user_id: String,
        reply: RpcReplyPort<Option<AuthorizationOutcome>>,
    },
    /// A popup relayed its message from `sender_origin`.
    Deliver {
        attempt_id: String,
        sender_origin: String,
        message: PopupMessage,
        reply: RpcReplyPort<Delivery>,
    },
    /// The popup closed or the opener gave up; resolves any waiter as cancelled.
    /// Ignored unless `user_id` owns the attempt.
    Abandon { attempt_id: String, user_id: String },
}

/// What happened to a relayed popup message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Accepted { opener_origin: String },
    /// Sent from a different origin than the opener; discarded.
    OriginMismatch { opener_origin: String },
    UnknownAttempt,
}

struct PendingAttempt {
    user_id: String,
    opener_origin: String,
    registered_at: Instant,
    waiter: Option<RpcReplyPort<Option<AuthorizationOutcome>>>,
    // outcome that arrived before anyone awaited it
    delivered: Option<AuthorizationOutcome>,
    // past its lifetime; kept only to answer late awaits
    expired: bool,
}

struct BrokerState {
    attempts: HashMap<String, PendingAttempt>,
    ttl: Duration,
}

impl BrokerState {
    /// Resolve attempts past their lifetime as cancelled.
    ///
    /// A pending waiter is answered and the attempt dropped. Without a waiter
    /// the attempt stays as a cancelled tombstone so a late await still sees
    /// `Cancelled` rather than an unknown id.
    fn sweep_expired(&mut self) {
        let ttl = self.ttl;
        self.attempts.retain(|attempt_id, attempt| {
            let age = attempt.registered_at.elapsed();
            if age <= ttl {
                return true;
            }
            if let Some(waiter) = attempt.waiter.take() {
                debug!(attempt_id, "authorization attempt expired while awaited");
                let _ = waiter.send(Some(AuthorizationOutcome::Cancelled));
                return false;
            }
            if age > ttl.saturating_add(EXPIRED_RETENTION) {
                return false;
            }
            if !attempt.expired {
                debug!(attempt_id, "authorization attempt expired");
                attempt.expired = true;
                attempt.delivered = Some(AuthorizationOutcome::Cancelled);
            }
            true
        });
    }
}

struct AuthorizationBrokerActor;

#[ractor::async_trait]
impl Actor for AuthorizationBrokerActor {
    type Msg = BrokerMessage;
    type State = BrokerState;
    type Arguments = Duration;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        ttl: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(ttl_secs = ttl.as_secs(), "AuthorizationBroker started");
        Ok(BrokerState {
            attempts: HashMap::new(),
            ttl,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.sweep_expired();
        match message {
            BrokerMessage::Register {
                attempt_id,
                user_id,
                opener_origin,
            } => {
                debug!(attempt_id, user_id, opener_origin, "authorization attempt registered");
                state.attempts.insert(
                    attempt_id,
                    PendingAttempt {
                        user_id,
                        opener_origin,
                        registered_at: Instant::now(),
                        waiter: None,
                        delivered: None,
                        expired: false,
                    },
                );
            }
            BrokerMessage::Await {
                attempt_id,
                user_id,
                reply,
            } => Self::handle_await(state, attempt_id, user_id, reply),
            BrokerMessage::Deliver {
                attempt_id,
                sender_origin,
                message,
                reply,
            } => {
                let delivery = Self::handle_deliver(state, &attempt_id, &sender_origin, message);
                let _ = reply.send(delivery);
            }
            BrokerMessage::Abandon {
                attempt_id,
                user_id,
            } => {
                match state.attempts.get(&attempt_id) {
                    Some(attempt) if attempt.user_id != user_id => {
                        warn!(attempt_id, user_id, "ignoring abandon of another user's attempt");
                    }
                    Some(_) => {
                        if let Some(attempt) = state.attempts.remove(&attempt_id) {
                            info!(attempt_id, "authorization attempt abandoned");
                            if let Some(waiter) = attempt.waiter {
                                let _ = waiter.send(Some(AuthorizationOutcome::Cancelled));
                            }
                        }
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}

impl AuthorizationBrokerActor {
    fn handle_await(
        state: &mut BrokerState,
        attempt_id: String,
        user_id: String,
        reply: RpcReplyPort<Option<AuthorizationOutcome>>,
    ) {
        let Some(attempt) = state.attempts.get_mut(&attempt_id) else {
            let _ = reply.send(None);
            return;
        };
        if attempt.user_id != user_id {
            warn!(attempt_id, "authorization attempt awaited by another user");
            let _ = reply.send(None);
            return;
        }
        if let Some(outcome) = attempt.delivered.take() {
            state.attempts.remove(&attempt_id);
            let _ = reply.send(Some(outcome));
            return;
        }
        // one listener per attempt; a newer waiter replaces the old one
        if let Some(previous) = attempt.waiter.replace(reply) {
            let _ = previous.send(Some(AuthorizationOutcome::Cancelled));
        }
    }

    fn handle_deliver(
        state: &mut BrokerState,
        attempt_id: &str,
        sender_origin: &str,
        message: PopupMessage,
    ) -> Delivery {
        let Some(attempt) = state.attempts.get_mut(attempt_id) else {
            warn!(attempt_id, "popup message for unknown authorization attempt");
            return Delivery::UnknownAttempt;
        };
        if attempt.expired {
            warn!(attempt_id, "popup message for expired authorization attempt");
            return Delivery::UnknownAttempt;
        }
        let opener_origin = attempt.opener_origin.clone();
        let Some(message) = accept_from(&opener_origin, sender_origin, message) else {
            warn!(
                attempt_id,
                sender_origin, opener_origin, "discarding popup message from foreign origin"
            );
            return Delivery::OriginMismatch { opener_origin };
        };

        let outcome = AuthorizationOutcome::from(message);
        match attempt.waiter.take() {
            Some(waiter) => {
                state.attempts.remove(attempt_id);
                let _ = waiter.send(Some(outcome));
            }
            None => attempt.delivered = Some(outcome),
        }
        Delivery::Accepted { opener_origin }
    }
}

/// Handle for interacting with the broker actor.
#[derive(Clone)]
pub struct AuthorizationBroker {
    actor: ActorRef<BrokerMessage>,
    ttl: Duration,
}

impl AuthorizationBroker {
    /// Spawn the broker; attempts older than `ttl` resolve as cancelled.
    pub async fn spawn(ttl: Duration) -> Result<Self, JournalError> {
        let (actor, _jh) = Actor::spawn(None, AuthorizationBrokerActor, ttl)
            .await
            .map_err(|e| JournalError::RactorError(format!("spawn AuthorizationBroker: {e}")))?;
        Ok(Self { actor, ttl })
    }

    pub fn register(
        &self,
        attempt_id: &str,
        user_id: &str,
        opener_origin: &str,
    ) -> Result<(), JournalError> {
        self.actor
            .cast(BrokerMessage::Register {
                attempt_id: attempt_id.to_string(),
                user_id: user_id.to_string(),
                opener_origin: opener_origin.to_string(),
            })
            .map_err(|e| JournalError::RactorError(format!("Register cast failed: {e}")))
    }

    /// Resolve once the popup relays its message, the attempt is abandoned,
    /// or the attempt's lifetime runs out. Never waits longer than the TTL.
    pub async fn await_outcome(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> Result<AuthorizationOutcome, JournalError> {
        let result = self
            .actor
            .call(
                |reply| BrokerMessage::Await {
                    attempt_id: attempt_id.to_string(),
                    user_id: user_id.to_string(),
                    reply,
                },
                Some(self.ttl),
            )
            .await
            .map_err(|e| JournalError::RactorError(format!("Await RPC failed: {e}")))?;

        match result {
            CallResult::Success(Some(outcome)) => Ok(outcome),
            CallResult::Success(None) => Err(JournalError::UnknownAttempt),
            CallResult::Timeout => {
                info!(attempt_id, "authorization attempt timed out");
                self.abandon(attempt_id, user_id);
                Ok(AuthorizationOutcome::Cancelled)
            }
            CallResult::SenderError => Ok(AuthorizationOutcome::Cancelled),
        }
    }

    pub async fn deliver(
        &self,
        attempt_id: &str,
        sender_origin: &str,
        message: PopupMessage,
    ) -> Result<Delivery, JournalError> {
        let result = self
            .actor
            .call(
                |reply| BrokerMessage::Deliver {
                    attempt_id: attempt_id.to_string(),
                    sender_origin: sender_origin.to_string(),
                    message,
                    reply,
                },
                None,
            )
            .await
            .map_err(|e| JournalError::RactorError(format!("Deliver RPC failed: {e}")))?;
        match result {
            CallResult::Success(delivery) => Ok(delivery),
            _ => Err(JournalError::RactorError(
                "Deliver RPC ended without reply".to_string(),
            )),
        }
    }

    pub fn abandon(&self, attempt_id: &str, user_id: &str) {
        let _ = self.actor.cast(BrokerMessage::Abandon {
            attempt_id: attempt_id.to_string(),
            user_id: user_id.to_string(),
        });
    }
}
