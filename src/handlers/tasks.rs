use crate::db::{NewTask, TaskRecord};
use crate::error::JournalError;
use crate::middleware::auth::RequireUser;
use crate::router::JournalState;
use crate::service::SavedTask;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(flatten)]
    pub task: NewTask,
    #[serde(default)]
    pub sync_to_calendar: bool,
}

/// POST /tasks -> the saved task plus what happened on the calendar side.
pub async fn create_task(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<SavedTask>), JournalError> {
    let saved = state
        .task_sync
        .save_task(&user_id, body.task, body.sync_to_calendar)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn list_tasks(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<Vec<TaskRecord>>, JournalError> {
    Ok(Json(state.tasks.list(&user_id).await?))
}

pub async fn get_task(
    State(state): State<JournalState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<i64>,
) -> Result<Json<TaskRecord>, JournalError> {
    state
        .tasks
        .get(&user_id, id)
        .await?
        .map(Json)
        .ok_or(JournalError::TaskNotFound(id))
}
