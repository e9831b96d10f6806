use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Sampling options for a single text-to-image call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    pub steps: u32,
    pub seed: u64,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self { steps: 20, seed: 42 }
    }
}

/// A loaded text-to-image model.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    /// Run the model and return the encoded image bytes.
    async fn run(&self, prompt: &str, options: &InferenceOptions) -> Result<Vec<u8>, PipelineError>;
}

/// Text-to-image model hosted on Cloudflare Workers AI.
pub struct WorkersAiPipeline {
    http: Client,
    url: String,
    api_token: String,
}

#[derive(Serialize)]
struct TextToImageRequest<'a> {
    prompt: &'a str,
    num_steps: u32,
    seed: u64,
}

impl WorkersAiPipeline {
    /// `timeout` bounds each model call.
    pub fn new(
        account_id: &str,
        api_token: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let url = format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/{}",
            account_id, model
        );
        Self::with_url(url, api_token, timeout)
    }

    fn with_url(url: String, api_token: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url,
            api_token: api_token.to_string(),
        })
    }
}

#[async_trait]
impl ImagePipeline for WorkersAiPipeline {
    async fn run(&self, prompt: &str, options: &InferenceOptions) -> Result<Vec<u8>, PipelineError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_token)
            .json(&TextToImageRequest {
                prompt,
                num_steps: options.steps,
                seed: options.seed,
            })
            .send()
            .await
            .map_err(PipelineError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Model(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let bytes = response.bytes().await.map_err(PipelineError::Http)?;
        Ok(bytes.to_vec())
    }
}

type Loader = Box<dyn Fn() -> Result<Arc<dyn ImagePipeline>, PipelineError> + Send + Sync>;

/// Owns the text-to-image model and the directory its output is written to.
///
/// The model is loaded by an explicit [`ModelService::load`] call and reused
/// for every generation until [`ModelService::unload`]. Generating while
/// unloaded is an error.
pub struct ModelService {
    loader: Loader,
    pipeline: RwLock<Option<Arc<dyn ImagePipeline>>>,
    options: InferenceOptions,
    output_dir: PathBuf,
}

impl ModelService {
    pub fn new<F>(loader: F, options: InferenceOptions, output_dir: impl Into<PathBuf>) -> Self
    where
        F: Fn() -> Result<Arc<dyn ImagePipeline>, PipelineError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            pipeline: RwLock::new(None),
            options,
            output_dir: output_dir.into(),
        }
    }

    /// Service backed by Workers AI; credentials are checked at load time.
    pub fn workers_ai(
        account_id: Option<String>,
        api_token: Option<String>,
        model: String,
        timeout: Duration,
        options: InferenceOptions,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            move || {
                let account_id = account_id
                    .as_deref()
                    .ok_or(PipelineError::Config("CF_ACCOUNT_ID is not set"))?;
                let api_token = api_token
                    .as_deref()
                    .ok_or(PipelineError::Config("CF_API_TOKEN is not set"))?;
                let pipeline: Arc<dyn ImagePipeline> = Arc::new(WorkersAiPipeline::new(
                    account_id, api_token, &model, timeout,
                )?);
                Ok(pipeline)
            },
            options,
            output_dir,
        )
    }

    /// Load the model if it is not loaded yet. Safe to call repeatedly.
    pub async fn load(&self) -> Result<(), PipelineError> {
        let mut slot = self.pipeline.write().await;
        if slot.is_none() {
            tracing::info!("Model not loaded, loading model");
            *slot = Some((self.loader)()?);
            tracing::info!("Model loaded successfully");
        }
        Ok(())
    }

    pub async fn is_loaded(&self) -> bool {
        self.pipeline.read().await.is_some()
    }

    /// Drop the model. A later [`ModelService::load`] loads it again.
    pub async fn unload(&self) {
        if self.pipeline.write().await.take().is_some() {
            tracing::info!("Model unloaded");
        }
    }

    /// Generate one image for `prompt`, save it as `{task_id}.<ext>` and
    /// return the file name.
    pub async fn generate(&self, task_id: Uuid, prompt: &str) -> Result<String, PipelineError> {
        let pipeline = self
            .pipeline
            .read()
            .await
            .clone()
            .ok_or(PipelineError::NotLoaded)?;

        tracing::info!(
            task_id = %task_id,
            steps = self.options.steps,
            "Generating image"
        );

        let bytes = pipeline.run(prompt, &self.options).await?;
        let format = image::guess_format(&bytes).map_err(|_| PipelineError::NotAnImage)?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = format!("{}.{}", task_id, extension);
        tokio::fs::write(self.output_dir.join(&file_name), &bytes).await?;

        tracing::info!(task_id = %task_id, file = %file_name, "Image saved");
        Ok(file_name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Model is not loaded")]
    NotLoaded,

    #[error("Model configuration error: {0}")]
    Config(&'static str),

    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model returned an error: {0}")]
    Model(String),

    #[error("Model output is not a recognized image format")]
    NotAnImage,

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}
