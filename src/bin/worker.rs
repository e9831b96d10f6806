use std::sync::Arc;

use synthmed::{
    config::AppConfig,
    services::{
        pipeline::{InferenceOptions, ModelService},
        task_store::{RedisTaskStore, TaskStore},
    },
    telemetry, worker,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    tracing::info!("Starting generation worker");

    let config = AppConfig::from_env()?;

    let redis_url = config
        .redis_url
        .as_deref()
        .ok_or("REDIS_URL must be set for the standalone worker")?;

    tracing::info!("Connecting to Redis task queue");
    let redis = RedisTaskStore::new(redis_url, config.task_ttl())?;
    redis.health_check().await?;
    let store: Arc<dyn TaskStore> = Arc::new(redis);

    let model = Arc::new(ModelService::workers_ai(
        config.cf_account_id.clone(),
        config.cf_api_token.clone(),
        config.image_model.clone(),
        config.model_timeout(),
        InferenceOptions {
            steps: config.inference_steps,
            seed: config.seed,
        },
        &config.output_dir,
    ));
    model.load().await?;

    let handles = worker::spawn_pool(config.worker_concurrency, store, model);
    for handle in handles {
        handle.await?;
    }
    Ok(())
}
