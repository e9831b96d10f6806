use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::task::{QueuedTask, TaskStatus};

const QUEUE_KEY: &str = "synthmed:tasks";
const PROCESSING_KEY: &str = "synthmed:processing";
const STATUS_KEY_PREFIX: &str = "synthmed:task:";

/// Task queue plus the result store keyed by task id.
///
/// Each task id is written by one worker at a time; status writes are
/// last-write-wins.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn enqueue(&self, task: &QueuedTask) -> Result<(), TaskStoreError>;

    /// Take the next task, if any, and hold it as in-flight.
    async fn dequeue(&self) -> Result<Option<QueuedTask>, TaskStoreError>;

    /// Release an in-flight task taken by `dequeue`.
    async fn complete(&self, task: &QueuedTask) -> Result<(), TaskStoreError>;

    async fn put_status(&self, status: &TaskStatus) -> Result<(), TaskStoreError>;

    async fn get_status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, TaskStoreError>;

    async fn health_check(&self) -> Result<(), TaskStoreError>;
}

/// Redis-backed task queue and status store.
pub struct RedisTaskStore {
    client: redis::Client,
    ttl: Duration,
}

impl RedisTaskStore {
    pub fn new(redis_url: &str, ttl: Duration) -> Result<Self, TaskStoreError> {
        let client = redis::Client::open(redis_url).map_err(TaskStoreError::Redis)?;
        Ok(Self { client, ttl })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, TaskStoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(TaskStoreError::Redis)
    }
}

fn status_key(task_id: Uuid) -> String {
    format!("{}{}", STATUS_KEY_PREFIX, task_id)
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn enqueue(&self, task: &QueuedTask) -> Result<(), TaskStoreError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(task).map_err(TaskStoreError::Serialize)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(TaskStoreError::Redis)?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedTask>, TaskStoreError> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(TaskStoreError::Redis)?;

        match result {
            Some(payload) => {
                let task: QueuedTask =
                    serde_json::from_str(&payload).map_err(TaskStoreError::Serialize)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, task: &QueuedTask) -> Result<(), TaskStoreError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(task).map_err(TaskStoreError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
            .await
            .map_err(TaskStoreError::Redis)?;
        Ok(())
    }

    async fn put_status(&self, status: &TaskStatus) -> Result<(), TaskStoreError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(status).map_err(TaskStoreError::Serialize)?;
        conn.set_ex::<_, _, ()>(status_key(status.task_id), payload, self.ttl.as_secs())
            .await
            .map_err(TaskStoreError::Redis)?;
        Ok(())
    }

    async fn get_status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, TaskStoreError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn
            .get(status_key(task_id))
            .await
            .map_err(TaskStoreError::Redis)?;

        payload
            .map(|p| serde_json::from_str(&p).map_err(TaskStoreError::Serialize))
            .transpose()
    }

    async fn health_check(&self) -> Result<(), TaskStoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(TaskStoreError::Redis)?;
        Ok(())
    }
}

/// In-process queue and status map, for single-process deployments and tests.
///
/// Status records expire `ttl` after their last write, like the Redis store's
/// `SET EX` records; expired entries are swept on every write.
pub struct MemoryTaskStore {
    queue: Mutex<VecDeque<QueuedTask>>,
    processing: Mutex<Vec<QueuedTask>>,
    statuses: RwLock<HashMap<Uuid, (TaskStatus, Instant)>>,
    ttl: Duration,
}

impl MemoryTaskStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: Mutex::default(),
            processing: Mutex::default(),
            statuses: RwLock::default(),
            ttl,
        }
    }

    pub async fn in_flight(&self) -> usize {
        self.processing.lock().await.len()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn enqueue(&self, task: &QueuedTask) -> Result<(), TaskStoreError> {
        self.queue.lock().await.push_back(task.clone());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedTask>, TaskStoreError> {
        let task = self.queue.lock().await.pop_front();
        if let Some(task) = &task {
            self.processing.lock().await.push(task.clone());
        }
        Ok(task)
    }

    async fn complete(&self, task: &QueuedTask) -> Result<(), TaskStoreError> {
        let mut processing = self.processing.lock().await;
        if let Some(pos) = processing.iter().position(|t| t == task) {
            processing.remove(pos);
        }
        Ok(())
    }

    async fn put_status(&self, status: &TaskStatus) -> Result<(), TaskStoreError> {
        let now = Instant::now();
        let mut statuses = self.statuses.write().await;
        statuses.retain(|_, (_, written)| now.duration_since(*written) < self.ttl);
        statuses.insert(status.task_id, (status.clone(), now));
        Ok(())
    }

    async fn get_status(&self, task_id: Uuid) -> Result<Option<TaskStatus>, TaskStoreError> {
        let mut statuses = self.statuses.write().await;
        match statuses.get(&task_id) {
            Some((_, written)) if written.elapsed() >= self.ttl => {
                statuses.remove(&task_id);
                Ok(None)
            }
            Some((status, _)) => Ok(Some(status.clone())),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<(), TaskStoreError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskStoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
