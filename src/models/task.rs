use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a background generation task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

/// Status record of a background task, as stored and as returned to callers.
///
/// `result` (the generated image reference) is only ever set on a
/// succeeded task; `error` only on a failed one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub task_id: Uuid,
    pub status: TaskState,
    pub result: Option<String>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    pub fn pending(task_id: Uuid) -> Self {
        Self::new(task_id, TaskState::Pending, None, None)
    }

    pub fn running(task_id: Uuid) -> Self {
        Self::new(task_id, TaskState::Running, None, None)
    }

    pub fn succeeded(task_id: Uuid, result: String) -> Self {
        Self::new(task_id, TaskState::Succeeded, Some(result), None)
    }

    pub fn failed(task_id: Uuid, error: String) -> Self {
        Self::new(task_id, TaskState::Failed, None, Some(error))
    }

    fn new(task_id: Uuid, status: TaskState, result: Option<String>, error: Option<String>) -> Self {
        Self {
            task_id,
            status,
            result,
            error,
            updated_at: Utc::now(),
        }
    }
}

/// Task payload serialized into the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedTask {
    pub task_id: Uuid,
    pub prompt: String,
}

/// POST /tasks body.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitTaskRequest {
    #[garde(length(min = 1, max = 2000))]
    pub prompt: String,
}

/// POST /tasks response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    pub task_id: Uuid,
    pub status: TaskState,
}
