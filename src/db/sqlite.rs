use crate::db::schema::SQLITE_INIT;
use crate::error::JournalError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

/// Open the pool and apply the bundled schema.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, JournalError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(connect_opts)
        .await?;
    init_schema(&pool).await?;
    info!(database_url, "database ready");
    Ok(pool)
}

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), JournalError> {
    // sqlx::query runs one statement at a time
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, JournalError> {
    let parsed = DateTime::parse_from_rfc3339(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // a single connection keeps every query on the same in-memory database
    connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite pool")
}
