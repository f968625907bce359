//! SQL DDL for initializing the journal calendar storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `calendar_credentials`: one row per user, `user_id` UNIQUE
/// - `tasks`: the journal's to-do items, optionally linked to a remote event
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS calendar_credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    access_token TEXT NOT NULL,
    refresh_token TEXT NULL,
    expires_at TEXT NOT NULL, -- RFC3339
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL  -- RFC3339
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    text TEXT NOT NULL,
    date TEXT NOT NULL, -- YYYY-MM-DD
    important INTEGER NOT NULL DEFAULT 0,
    remote_event_id TEXT NULL,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id);
"#;
