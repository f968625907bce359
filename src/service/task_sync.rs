//! Task save with the calendar mirror as a strictly optional side effect.

use crate::db::{CredentialStore, NewTask, TaskRecord, TaskStore};
use crate::error::JournalError;
use crate::google_oauth::TokenRefreshManager;
use crate::service::event_sync::EventSyncExecutor;
use crate::types::calendar::{CalendarSync, SyncStage};

use serde::Serialize;
use tracing::{debug, warn};

/// Lives for exactly one save call.
struct PendingSyncRequest {
    task: TaskRecord,
    sync_requested: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedTask {
    pub task: TaskRecord,
    pub calendar_sync: CalendarSync,
}

#[derive(Clone)]
pub struct TaskSyncService {
    tasks: TaskStore,
    credentials: CredentialStore,
    refresher: TokenRefreshManager,
    executor: EventSyncExecutor,
}

impl TaskSyncService {
    pub fn new(
        tasks: TaskStore,
        credentials: CredentialStore,
        refresher: TokenRefreshManager,
        executor: EventSyncExecutor,
    ) -> Self {
        Self {
            tasks,
            credentials,
            refresher,
            executor,
        }
    }

    /// Persist the task, then try to mirror it.
    ///
    /// Only the task insert can fail this call; everything after it is
    /// reported through `calendar_sync` and never touches the saved task
    /// beyond attaching the remote event id.
    pub async fn save_task(
        &self,
        user_id: &str,
        new_task: NewTask,
        sync_to_calendar: bool,
    ) -> Result<SavedTask, JournalError> {
        if new_task.text.trim().is_empty() {
            return Err(JournalError::InvalidRequest("task text is required".to_string()));
        }
        let task = self.tasks.insert(user_id, &new_task).await?;
        let request = PendingSyncRequest {
            task,
            sync_requested: sync_to_calendar,
        };
        Ok(self.run_sync(request).await)
    }

    async fn run_sync(&self, request: PendingSyncRequest) -> SavedTask {
        let PendingSyncRequest {
            task,
            sync_requested,
        } = request;
        if !sync_requested {
            return SavedTask {
                task,
                calendar_sync: CalendarSync::NotRequested,
            };
        }

        let credential = match self.credentials.get(&task.user_id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!(user_id = %task.user_id, "calendar not connected; skipping sync");
                return SavedTask {
                    task,
                    calendar_sync: CalendarSync::NotConnected,
                };
            }
            Err(e) => {
                warn!(user_id = %task.user_id, error = %e, "could not load calendar credential");
                return failed(task, SyncStage::Credential, &e);
            }
        };

        let token = match self.refresher.ensure_valid_access_token(&credential).await {
            Ok(token) => token,
            Err(e) => return failed(task, SyncStage::Refresh, &e),
        };

        let calendar_sync = self
            .executor
            .sync_task_to_calendar(&task, &token.access_token)
            .await;
        let Some(remote_event_id) = calendar_sync.remote_event_id() else {
            return SavedTask {
                task,
                calendar_sync,
            };
        };

        match self
            .tasks
            .set_remote_event_id(&task.user_id, task.id, remote_event_id)
            .await
        {
            Ok(linked) => SavedTask {
                task: linked,
                calendar_sync,
            },
            Err(e) => {
                warn!(task_id = task.id, remote_event_id, error = %e, "could not link calendar event to task");
                failed(task, SyncStage::Link, &e)
            }
        }
    }
}

fn failed(task: TaskRecord, stage: SyncStage, error: &JournalError) -> SavedTask {
    SavedTask {
        task,
        calendar_sync: CalendarSync::Failed {
            stage,
            warning: format!("Task saved but not added to your calendar: {error}"),
        },
    }
}
