pub mod generation;
pub mod task;
