//! Test helper utilities shared by the integration tests
#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use synthmed::app_state::AppState;
use synthmed::models::generation::{GenerationRequest, Severity, View};
use synthmed::services::relay::WorkerClient;
use synthmed::services::task_store::MemoryTaskStore;
use synthmed::services::tasks::TaskService;

/// Base64 of an empty zip archive (end-of-central-directory record only).
pub const EMPTY_ZIP_BASE64: &str = "UEsFBgAAAAAAAAAAAAAAAAAAAAAAAA==";

pub fn sample_request() -> GenerationRequest {
    GenerationRequest {
        age: 65,
        view: View::PA,
        finding: vec!["Pneumonia".to_string(), "Lung Nodule".to_string()],
        severity: Severity::Severe,
        num_images: 5,
    }
}

pub fn sample_request_json() -> Value {
    json!({
        "age": 65,
        "view": "PA",
        "finding": ["Pneumonia", "Lung Nodule"],
        "severity": "Severe",
        "num_images": 5
    })
}

/// Payload the relay is expected to send for [`sample_request`].
pub fn expected_worker_payload() -> Value {
    json!({
        "prompt": "High-resolution monochrome chest X-ray, PA view, of a 65-year-old patient. \
                   The image shows signs of severe Pneumonia, Lung Nodule. \
                   Medical imaging, photorealistic, 4k, detailed.",
        "num_images": 5
    })
}

/// Worker body with fields after the archive and a number whose textual form
/// differs from its canonical serialization.
pub fn worker_body_with_extras() -> String {
    format!(
        r#"{{"zip_file_base64":"{}","count":5,"ratio":0.10,"note":"b\u00e9ta"}}"#,
        EMPTY_ZIP_BASE64
    )
}

/// Listener that accepts connections into its backlog but never answers.
/// Keep the returned listener alive for the duration of the test.
pub fn silent_worker() -> (std::net::TcpListener, String) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));
    (listener, url)
}

/// Address nothing is listening on.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn app_state(worker_url: &str, timeout: Duration) -> AppState {
    let relay = WorkerClient::new(worker_url, timeout).expect("build worker client");
    AppState::new(relay, TaskService::new(Arc::new(MemoryTaskStore::new(Duration::from_secs(60)))))
}
