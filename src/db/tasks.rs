use crate::db::models::{NewTask, TaskRecord};
use crate::db::sqlite::{SqlitePool, parse_timestamp};
use crate::error::JournalError;
use chrono::{NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const SELECT_TASK: &str = r#"SELECT id, user_id, text, date, important, remote_event_id, created_at
   FROM tasks"#;

/// Data-access object for the journal's `tasks` table.
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, user_id: &str, task: &NewTask) -> Result<TaskRecord, JournalError> {
        let result = sqlx::query(
            r#"INSERT INTO tasks (user_id, text, date, important, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user_id)
        .bind(task.text.as_str())
        .bind(task.date.format("%Y-%m-%d").to_string())
        .bind(i64::from(task.important))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(user_id, id)
            .await?
            .ok_or(JournalError::TaskNotFound(id))
    }

    pub async fn get(&self, user_id: &str, id: i64) -> Result<Option<TaskRecord>, JournalError> {
        let row = sqlx::query(&format!("{SELECT_TASK} WHERE id = ? AND user_id = ?"))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_model).transpose()
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<TaskRecord>, JournalError> {
        let rows = sqlx::query(&format!(
            "{SELECT_TASK} WHERE user_id = ? ORDER BY date, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_model).collect()
    }

    /// Attach the remote calendar event created for this task.
    pub async fn set_remote_event_id(
        &self,
        user_id: &str,
        id: i64,
        remote_event_id: &str,
    ) -> Result<TaskRecord, JournalError> {
        sqlx::query("UPDATE tasks SET remote_event_id = ? WHERE id = ? AND user_id = ?")
            .bind(remote_event_id)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.get(user_id, id)
            .await?
            .ok_or(JournalError::TaskNotFound(id))
    }

    fn row_to_model(row: SqliteRow) -> Result<TaskRecord, JournalError> {
        let id: i64 = row.try_get("id")?;
        let user_id: String = row.try_get("user_id")?;
        let text: String = row.try_get("text")?;
        let date_str: String = row.try_get("date")?;
        let important_i: i64 = row.try_get("important")?;
        let remote_event_id: Option<String> = row.try_get("remote_event_id")?;
        let created_at: String = row.try_get("created_at")?;

        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(TaskRecord {
            id,
            user_id,
            text,
            date,
            important: important_i != 0,
            remote_event_id,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::memory_pool;

    fn new_task(text: &str) -> NewTask {
        NewTask {
            text: text.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date"),
            important: true,
        }
    }

    #[tokio::test]
    async fn insert_then_link_remote_event() {
        let store = TaskStore::new(memory_pool().await);
        let task = store.insert("u1", &new_task("water plants")).await.expect("insert");
        assert!(task.remote_event_id.is_none());
        assert!(task.important);

        let linked = store
            .set_remote_event_id("u1", task.id, "evt-42")
            .await
            .expect("link");
        assert_eq!(linked.remote_event_id.as_deref(), Some("evt-42"));
        assert_eq!(linked.text, task.text);
        assert_eq!(linked.date, task.date);
    }

    #[tokio::test]
    async fn other_users_cannot_read_tasks() {
        let store = TaskStore::new(memory_pool().await);
        let task = store.insert("alice", &new_task("journal")).await.expect("insert");

        assert!(store.get("bob", task.id).await.expect("get").is_none());
        assert!(store.list("bob").await.expect("list").is_empty());
        assert_eq!(store.list("alice").await.expect("list").len(), 1);
    }
}
