use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A user's stored calendar credential. At most one per `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub user_id: String,
    pub access_token: String,
    /// Absent when the provider's last grant did not issue one.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// `true` while `expires_at` is strictly after `now + skew_secs`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, skew_secs: i64) -> bool {
        self.expires_at > now + Duration::seconds(skew_secs)
    }
}

/// Token material written on (re)authorization or refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: i64,
    pub user_id: String,
    pub text: String,
    pub date: NaiveDate,
    pub important: bool,
    pub remote_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub text: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub important: bool,
}
