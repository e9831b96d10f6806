use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::task::{SubmitTaskRequest, SubmitTaskResponse, TaskState, TaskStatus};
use crate::routes::error::ApiError;

/// POST /tasks — enqueue a direct generation task for the worker pool.
pub async fn submit_task(
    State(state): State<AppState>,
    payload: Result<Json<SubmitTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitTaskResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let task_id = state.tasks.submit(&request.prompt).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitTaskResponse {
            task_id,
            status: TaskState::Pending,
        }),
    ))
}

/// GET /tasks/{task_id} — current state; the result appears once terminal.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskStatus>, ApiError> {
    state
        .tasks
        .status(task_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Unknown task {}", task_id)))
}
