//! Service layer: the pieces that coordinate stores, the provider and the popup relay.
//!
//! - `authorization_broker.rs`: actor pairing pending authorization attempts with popup messages
//! - `connection.rs`: "calendar connected" signal and its change feed
//! - `event_sync.rs`: one-shot calendar event creation for a task
//! - `task_sync.rs`: task save with the calendar mirror as a non-fatal side effect

pub mod authorization_broker;
pub mod connection;
pub mod event_sync;
pub mod task_sync;

pub use authorization_broker::AuthorizationBroker;
pub use connection::{ConnectionEvent, ConnectionNotifier};
pub use event_sync::EventSyncExecutor;
pub use task_sync::{SavedTask, TaskSyncService};
