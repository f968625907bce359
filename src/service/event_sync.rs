use crate::api::calendar_api::CalendarApi;
use crate::db::TaskRecord;
use crate::types::calendar::{
    CalendarEventRequest, CalendarSync, EventDate, EventReminders, SyncStage,
};
use tracing::{info, warn};

/// Mirrors one task as an all-day calendar event. One attempt, never retried.
#[derive(Clone)]
pub struct EventSyncExecutor {
    api: CalendarApi,
    annotation: String,
    important_marker: String,
}

impl EventSyncExecutor {
    pub fn new(api: CalendarApi, annotation: String, important_marker: String) -> Self {
        Self {
            api,
            annotation,
            important_marker,
        }
    }

    pub fn build_event(&self, task: &TaskRecord) -> CalendarEventRequest {
        let description = if task.important {
            format!("{}\n\n{}", self.annotation, self.important_marker)
        } else {
            self.annotation.clone()
        };
        CalendarEventRequest {
            summary: task.text.clone(),
            description,
            start: EventDate { date: task.date },
            end: EventDate { date: task.date },
            reminders: EventReminders { use_default: true },
        }
    }

    /// Create the event; any failure becomes a warning, never an error.
    pub async fn sync_task_to_calendar(&self, task: &TaskRecord, access_token: &str) -> CalendarSync {
        let event = self.build_event(task);
        match self.api.create_event(access_token, &event).await {
            Ok(remote_event_id) => {
                info!(task_id = task.id, remote_event_id, "task mirrored to calendar");
                CalendarSync::Synced { remote_event_id }
            }
            Err(e) => {
                warn!(task_id = task.id, user_id = %task.user_id, error = %e, "calendar event creation failed");
                CalendarSync::Failed {
                    stage: SyncStage::Event,
                    warning: format!("Task saved but not added to your calendar: {e}"),
                }
            }
        }
    }
}
