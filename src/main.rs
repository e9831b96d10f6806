use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;

use synthmed::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        pipeline::{InferenceOptions, ModelService},
        relay::WorkerClient,
        task_store::{MemoryTaskStore, RedisTaskStore, TaskStore},
        tasks::TaskService,
    },
    telemetry, worker,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let config = AppConfig::from_env()?;

    tracing::info!("Initializing synthmed relay");

    let prometheus_handle = Arc::new(PrometheusBuilder::new().install_recorder()?);
    routes::metrics::describe();

    tracing::info!(
        worker_url = %config.worker_url,
        timeout_secs = config.worker_timeout_secs,
        "Configuring remote worker client"
    );
    let relay = WorkerClient::new(&config.worker_url, config.worker_timeout())?;

    let store: Arc<dyn TaskStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Connecting to Redis task queue");
            Arc::new(RedisTaskStore::new(url, config.task_ttl())?)
        }
        None => {
            tracing::info!(
                concurrency = config.worker_concurrency,
                "REDIS_URL not set, running background tasks in-process"
            );
            let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new(config.task_ttl()));
            let model = Arc::new(model_service(&config));
            if let Err(e) = model.load().await {
                tracing::warn!(error = %e, "Model failed to load, background tasks will fail");
            }
            worker::spawn_pool(config.worker_concurrency, store.clone(), model);
            store
        }
    };

    let state = AppState::new(relay, TaskService::new(store));

    let app = routes::router(state).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    tracing::info!("Starting synthmed on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn model_service(config: &AppConfig) -> ModelService {
    ModelService::workers_ai(
        config.cf_account_id.clone(),
        config.cf_api_token.clone(),
        config.image_model.clone(),
        config.model_timeout(),
        InferenceOptions {
            steps: config.inference_steps,
            seed: config.seed,
        },
        &config.output_dir,
    )
}
