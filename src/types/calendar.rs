use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// All-day date boundary of a calendar event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDate {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventReminders {
    #[serde(rename = "useDefault")]
    pub use_default: bool,
}

/// Body of the provider's event-creation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEventRequest {
    pub summary: String,
    pub description: String,
    pub start: EventDate,
    pub end: EventDate,
    pub reminders: EventReminders,
}

/// The parts of the created event resource we read back.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEventResource {
    pub id: Option<String>,
}

/// Where a sync attempt gave up.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Credential,
    Refresh,
    Event,
    Link,
}

/// Result of the calendar side effect of a task save. Never an error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalendarSync {
    NotRequested,
    NotConnected,
    Synced { remote_event_id: String },
    Failed { stage: SyncStage, warning: String },
}

impl CalendarSync {
    pub fn remote_event_id(&self) -> Option<&str> {
        match self {
            Self::Synced { remote_event_id } => Some(remote_event_id),
            _ => None,
        }
    }
}
