mod helpers;

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::*;
use synthmed::services::relay::{RelayError, WorkerClient};

#[tokio::test]
async fn forwards_worker_body_unchanged() {
    let server = MockServer::start().await;
    let body = worker_body_with_extras();

    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .and(body_json(expected_worker_payload()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let response = client.generate(&sample_request()).await.unwrap();

    assert_eq!(response.into_bytes(), body.as_bytes());
}

#[tokio::test]
async fn slow_worker_reports_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "zip_file_base64": EMPTY_ZIP_BASE64 }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert!(matches!(err, RelayError::Timeout { .. }), "got {:?}", err);
    assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn silent_worker_reports_timeout() {
    let (_listener, url) = silent_worker();

    let client = WorkerClient::new(&url, Duration::from_millis(200)).unwrap();
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert!(matches!(err, RelayError::Timeout { .. }), "got {:?}", err);
    assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn worker_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert!(matches!(err, RelayError::Status { status: 500, .. }));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.message().contains("500"));
    assert!(err.message().contains("CUDA out of memory"));
}

#[tokio::test]
async fn connection_refused_is_a_connectivity_error() {
    let client = WorkerClient::new(&unreachable_base_url(), Duration::from_secs(5)).unwrap();
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert!(matches!(err, RelayError::Connect(_)), "got {:?}", err);
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.message().starts_with("Failed to connect to the AI worker"));
}

#[tokio::test]
async fn response_without_archive_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "done" })))
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert!(matches!(err, RelayError::MalformedResponse(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn non_json_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>tunnel offline</html>"))
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert!(matches!(err, RelayError::MalformedResponse(_)));
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "zip_file_base64": EMPTY_ZIP_BASE64 })),
        )
        .expect(4)
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let request = sample_request();
    let results = join_all((0..4).map(|_| client.generate(&request))).await;

    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test]
async fn failed_call_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate_dataset"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let client = WorkerClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    assert!(client.generate(&sample_request()).await.is_err());
}
