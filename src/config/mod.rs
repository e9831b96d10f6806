use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000"). Unused by the worker binary.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the remote generation worker. Changes per deployment,
    /// since it usually fronts a temporary tunnel to a GPU session.
    pub worker_url: String,

    /// Upper bound on one relay call, in seconds.
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,

    /// Redis connection string for the background task queue.
    /// When unset, tasks run on an in-process pool with an in-memory store.
    pub redis_url: Option<String>,

    /// How long task status records are kept, in seconds.
    #[serde(default = "default_task_ttl_secs")]
    pub task_ttl_secs: u64,

    /// Number of concurrent task processing loops.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Cloudflare account ID (text-to-image model host)
    pub cf_account_id: Option<String>,

    /// Cloudflare Workers AI API token
    pub cf_api_token: Option<String>,

    /// Text-to-image model identifier
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Upper bound on one text-to-image call, in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_inference_steps")]
    pub inference_steps: u32,

    /// Fixed seed so repeated prompts give reproducible images.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Directory generated images are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_worker_timeout_secs() -> u64 {
    300
}

fn default_task_ttl_secs() -> u64 {
    86_400
}

fn default_worker_concurrency() -> usize {
    1
}

fn default_image_model() -> String {
    "@cf/stabilityai/stable-diffusion-xl-base-1.0".to_string()
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_inference_steps() -> u32 {
    20
}

fn default_seed() -> u64 {
    42
}

fn default_output_dir() -> String {
    "generated".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }
}
