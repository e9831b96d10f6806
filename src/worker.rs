//! Background task processing loop.
//!
//! Each loop takes one task at a time from the [`TaskStore`], marks it
//! running, invokes the model and writes a terminal status. Failed tasks are
//! not retried; a failed terminal-status write is, a few times, before the
//! task is released.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::models::task::{QueuedTask, TaskStatus};
use crate::services::pipeline::ModelService;
use crate::services::task_store::{TaskStore, TaskStoreError};

pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Attempts at writing a task's terminal status before giving up on it.
pub const STATUS_WRITE_ATTEMPTS: u32 = 3;
const STATUS_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Process the next task from the queue.
/// Returns Ok(true) if a task was processed, Ok(false) if none was available.
pub async fn process_next_task(
    store: &dyn TaskStore,
    model: &ModelService,
) -> Result<bool, TaskStoreError> {
    let task = match store.dequeue().await? {
        Some(t) => t,
        None => return Ok(false),
    };

    tracing::info!(task_id = %task.task_id, "Processing generation task");
    if let Err(e) = store.put_status(&TaskStatus::running(task.task_id)).await {
        tracing::warn!(task_id = %task.task_id, error = %e, "Failed to mark task running");
    }

    let status = run_task(model, &task).await;
    let written = write_terminal_status(store, &status).await;

    // The in-flight entry is released even when the status write failed, so
    // the task is never held forever.
    store.complete(&task).await?;
    written?;
    Ok(true)
}

async fn write_terminal_status(
    store: &dyn TaskStore,
    status: &TaskStatus,
) -> Result<(), TaskStoreError> {
    let mut attempt = 1;
    loop {
        match store.put_status(status).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < STATUS_WRITE_ATTEMPTS => {
                tracing::warn!(
                    task_id = %status.task_id,
                    attempt,
                    error = %e,
                    "Failed to write task status, retrying"
                );
                sleep(STATUS_RETRY_DELAY * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                metrics::counter!("generation_task_status_write_failures_total").increment(1);
                tracing::error!(
                    task_id = %status.task_id,
                    status = ?status.status,
                    error = %e,
                    "Giving up on task status write"
                );
                return Err(e);
            }
        }
    }
}

async fn run_task(model: &ModelService, task: &QueuedTask) -> TaskStatus {
    let start = std::time::Instant::now();
    match model.generate(task.task_id, &task.prompt).await {
        Ok(image) => {
            metrics::counter!("generation_tasks_completed_total").increment(1);
            tracing::info!(
                task_id = %task.task_id,
                image = %image,
                duration_ms = start.elapsed().as_millis() as u64,
                "Task completed successfully"
            );
            TaskStatus::succeeded(task.task_id, image)
        }
        Err(e) => {
            metrics::counter!("generation_tasks_failed_total").increment(1);
            tracing::error!(task_id = %task.task_id, error = %e, "Task failed");
            TaskStatus::failed(task.task_id, e.to_string())
        }
    }
}

/// Poll for tasks until the process exits.
pub async fn run_loop(id: usize, store: Arc<dyn TaskStore>, model: Arc<ModelService>) {
    tracing::info!(worker = id, "Worker ready, starting task processing loop");

    loop {
        match process_next_task(store.as_ref(), &model).await {
            Ok(true) => {
                tracing::debug!(worker = id, "Task processed, checking for next task");
            }
            Ok(false) => {
                tracing::trace!(worker = id, "No tasks available, sleeping");
                sleep(POLL_INTERVAL).await;
            }
            Err(e) => {
                tracing::error!(worker = id, error = %e, "Error processing task");
                sleep(POLL_INTERVAL).await;
            }
        }
    }
}

/// Spawn `concurrency` processing loops sharing one store and model.
pub fn spawn_pool(
    concurrency: usize,
    store: Arc<dyn TaskStore>,
    model: Arc<ModelService>,
) -> Vec<JoinHandle<()>> {
    (0..concurrency.max(1))
        .map(|id| tokio::spawn(run_loop(id, store.clone(), model.clone())))
        .collect()
}
