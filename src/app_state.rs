use std::sync::Arc;

use crate::services::{relay::WorkerClient, tasks::TaskService};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<WorkerClient>,
    pub tasks: TaskService,
}

impl AppState {
    pub fn new(relay: WorkerClient, tasks: TaskService) -> Self {
        Self {
            relay: Arc::new(relay),
            tasks,
        }
    }
}
