use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
/// Returns metrics in Prometheus text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the metrics this service emits.
pub fn describe() {
    metrics::describe_counter!(
        "generation_requests_total",
        "Total dataset generation requests received"
    );
    metrics::describe_counter!(
        "generation_failures_total",
        "Relay calls that failed, labelled by kind"
    );
    metrics::describe_histogram!(
        "worker_call_seconds",
        "Duration of calls to the remote generation worker"
    );
    metrics::describe_counter!(
        "generation_tasks_submitted_total",
        "Background generation tasks submitted"
    );
    metrics::describe_counter!(
        "generation_tasks_completed_total",
        "Background generation tasks that succeeded"
    );
    metrics::describe_counter!(
        "generation_tasks_failed_total",
        "Background generation tasks that failed"
    );
}
