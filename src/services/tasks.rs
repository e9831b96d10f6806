use std::sync::Arc;
use uuid::Uuid;

use crate::models::task::{QueuedTask, TaskStatus};
use crate::services::task_store::{TaskStore, TaskStoreError};

/// Entry point for direct (worker-pool) image generation.
///
/// Independent of the relay: tasks are executed by [`crate::worker`] loops
/// reading from the same store.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Enqueue a generation task and return its id without waiting for it.
    pub async fn submit(&self, prompt: &str) -> Result<Uuid, TaskError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(TaskError::EmptyPrompt);
        }

        let task_id = Uuid::new_v4();
        // Status first, so a fast worker never finds a task without a record.
        self.store.put_status(&TaskStatus::pending(task_id)).await?;
        self.store
            .enqueue(&QueuedTask {
                task_id,
                prompt: prompt.to_string(),
            })
            .await?;

        metrics::counter!("generation_tasks_submitted_total").increment(1);
        tracing::info!(task_id = %task_id, "Generation task submitted");
        Ok(task_id)
    }

    /// Current status of a task, or `None` if the id is unknown or expired.
    pub async fn status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, TaskError> {
        Ok(self.store.get_status(task_id).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Task store error: {0}")]
    Store(#[from] TaskStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskState;
    use crate::services::task_store::MemoryTaskStore;
    use std::time::Duration;

    #[tokio::test]
    async fn submit_records_pending_and_enqueues() {
        let store = Arc::new(MemoryTaskStore::new(Duration::from_secs(60)));
        let service = TaskService::new(store.clone());

        let id = service.submit("a chest x-ray").await.unwrap();

        let status = service.status(id).await.unwrap().unwrap();
        assert_eq!(status.status, TaskState::Pending);
        assert!(status.result.is_none());

        let queued = store.dequeue().await.unwrap().unwrap();
        assert_eq!(queued.task_id, id);
        assert_eq!(queued.prompt, "a chest x-ray");
    }

    #[tokio::test]
    async fn rejects_blank_prompt() {
        let service = TaskService::new(Arc::new(MemoryTaskStore::new(Duration::from_secs(60))));
        assert!(matches!(
            service.submit("   ").await,
            Err(TaskError::EmptyPrompt)
        ));
    }

    #[tokio::test]
    async fn unknown_task_has_no_status() {
        let service = TaskService::new(Arc::new(MemoryTaskStore::new(Duration::from_secs(60))));
        assert!(service.status(Uuid::new_v4()).await.unwrap().is_none());
    }
}
