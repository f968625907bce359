//! Database module: row models, schema and SQLite-backed stores.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: pool construction and schema bootstrap
//! - `credentials.rs` / `tasks.rs`: per-table data-access objects

pub mod credentials;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod tasks;

pub use credentials::CredentialStore;
pub use models::{Credential, NewTask, TaskRecord, TokenGrant};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, connect};
pub use tasks::TaskStore;
