pub mod pipeline;
pub mod prompt;
pub mod relay;
pub mod task_store;
pub mod tasks;
