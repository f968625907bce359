use crate::db::models::{Credential, TokenGrant};
use crate::db::sqlite::{SqlitePool, parse_timestamp};
use crate::error::JournalError;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const SELECT_CREDENTIAL: &str = r#"SELECT user_id, access_token, refresh_token, expires_at,
   created_at, updated_at
   FROM calendar_credentials WHERE user_id = ?"#;

/// Data-access object for `calendar_credentials`.
///
/// Holds nothing but the pool; the refresh manager and the authorization
/// flow each receive a clone.
#[derive(Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Credential>, JournalError> {
        let row = sqlx::query(SELECT_CREDENTIAL)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_model).transpose()
    }

    pub async fn exists(&self, user_id: &str) -> Result<bool, JournalError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM calendar_credentials WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0 > 0)
    }

    /// Insert or replace the user's token pair.
    /// Uses SQLite `INSERT ... ON CONFLICT(user_id) DO UPDATE`; `created_at` survives.
    pub async fn upsert(&self, user_id: &str, grant: &TokenGrant) -> Result<Credential, JournalError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO calendar_credentials (
                user_id, access_token, refresh_token, expires_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token=excluded.access_token,
                refresh_token=excluded.refresh_token,
                expires_at=excluded.expires_at,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(grant.access_token.as_str())
        .bind(grant.refresh_token.as_deref())
        .bind(grant.expires_at.to_rfc3339())
        .bind(now.as_str())
        .bind(now.as_str())
        .execute(&self.pool)
        .await?;

        self.get(user_id).await?.ok_or(JournalError::CredentialNotFound)
    }

    /// Rewrite the token fields of an existing row.
    /// Fails with `CredentialNotFound` when the row is gone (e.g. disconnected meanwhile).
    pub async fn update(&self, user_id: &str, grant: &TokenGrant) -> Result<Credential, JournalError> {
        let result = sqlx::query(
            r#"UPDATE calendar_credentials SET
                access_token = ?,
                refresh_token = ?,
                expires_at = ?,
                updated_at = ?
              WHERE user_id = ?"#,
        )
        .bind(grant.access_token.as_str())
        .bind(grant.refresh_token.as_deref())
        .bind(grant.expires_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(JournalError::CredentialNotFound);
        }
        self.get(user_id).await?.ok_or(JournalError::CredentialNotFound)
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, user_id: &str) -> Result<bool, JournalError> {
        let result = sqlx::query("DELETE FROM calendar_credentials WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_model(row: SqliteRow) -> Result<Credential, JournalError> {
        let user_id: String = row.try_get("user_id")?;
        let access_token: String = row.try_get("access_token")?;
        let refresh_token: Option<String> = row.try_get("refresh_token")?;
        let expires_at: String = row.try_get("expires_at")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Credential {
            user_id,
            access_token,
            refresh_token,
            expires_at: parse_timestamp(&expires_at)?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::memory_pool;
    use chrono::Duration;

    fn grant(access: &str, refresh: Option<&str>) -> TokenGrant {
        TokenGrant {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn upsert_keeps_a_single_row_per_user() {
        let store = CredentialStore::new(memory_pool().await);
        store.upsert("u1", &grant("first", Some("r1"))).await.expect("first upsert");
        let second = store
            .upsert("u1", &grant("second", Some("r2")))
            .await
            .expect("second upsert");

        assert_eq!(second.access_token, "second");
        assert_eq!(second.refresh_token.as_deref(), Some("r2"));

        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM calendar_credentials")
            .fetch_one(&store.pool)
            .await
            .expect("count rows");
        assert_eq!(rec.0, 1);
    }

    #[tokio::test]
    async fn update_requires_an_existing_row() {
        let store = CredentialStore::new(memory_pool().await);
        let err = store
            .update("missing", &grant("a", None))
            .await
            .expect_err("update without row");
        assert!(matches!(err, JournalError::CredentialNotFound));
        assert!(store.get("missing").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn rows_are_isolated_per_user() {
        let store = CredentialStore::new(memory_pool().await);
        store.upsert("alice", &grant("a", Some("ra"))).await.expect("alice");

        assert!(store.exists("alice").await.expect("exists"));
        assert!(!store.exists("bob").await.expect("exists"));
        assert!(!store.delete("bob").await.expect("delete bob"));
        assert!(store.delete("alice").await.expect("delete alice"));
        assert!(!store.exists("alice").await.expect("exists after delete"));
    }

    #[tokio::test]
    async fn null_refresh_token_round_trips() {
        let store = CredentialStore::new(memory_pool().await);
        let saved = store.upsert("u1", &grant("a", None)).await.expect("upsert");
        assert!(saved.refresh_token.is_none());
    }
}
