use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::models::generation::{GenerationPayload, GenerationRequest, WorkerResponse};
use crate::services::prompt::build_prompt;

/// Longest excerpt of a remote error body carried into a failure message.
const BODY_EXCERPT_LEN: usize = 200;

/// Outcome of one relay call, consumed once by the caller.
pub type GenerationResult = Result<WorkerResponse, RelayError>;

/// Client for the remote dataset-generation worker.
///
/// One attempt per request, no retries. The wait bound is applied to the whole
/// call and should exceed any gateway timeout in front of the worker, so a
/// slow worker surfaces here as [`RelayError::Timeout`].
pub struct WorkerClient {
    http: Client,
    endpoint: String,
}

impl WorkerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RelayError::Client)?;

        Ok(Self {
            http,
            endpoint: format!("{}/generate_dataset", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the prompt for `request` and forward it to the worker.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let payload = GenerationPayload {
            prompt: build_prompt(request),
            num_images: request.num_images,
        };

        tracing::info!(
            endpoint = %self.endpoint,
            num_images = payload.num_images,
            "Sending generation request to remote worker"
        );

        let start = Instant::now();
        let result = self.send(&payload).await;
        metrics::histogram!("worker_call_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => tracing::info!(
                endpoint = %self.endpoint,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Received dataset from remote worker"
            ),
            Err(RelayError::Timeout { .. }) => tracing::warn!(
                endpoint = %self.endpoint,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Remote worker did not respond within the wait bound"
            ),
            Err(e) => tracing::error!(
                endpoint = %self.endpoint,
                error = %e,
                "Remote worker call failed"
            ),
        }

        if let Err(e) = &result {
            metrics::counter!("generation_failures_total", "kind" => e.kind()).increment(1);
        }

        result
    }

    async fn send(&self, payload: &GenerationPayload) -> GenerationResult {
        let response = self
            .http
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let raw = response.bytes().await.map_err(|e| self.classify(e))?;
        WorkerResponse::from_bytes(raw).map_err(RelayError::MalformedResponse)
    }

    /// Any expiry of the wait bound, including one hit while connecting, is a
    /// timeout; every other transport failure is a connectivity error.
    fn classify(&self, err: reqwest::Error) -> RelayError {
        if err.is_timeout() {
            RelayError::Timeout {
                endpoint: self.endpoint.clone(),
            }
        } else {
            RelayError::Connect(err)
        }
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("The AI worker took too long to respond ({endpoint})")]
    Timeout { endpoint: String },

    #[error("The AI worker returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to connect to the AI worker: {0}")]
    Connect(reqwest::Error),

    #[error("The AI worker returned an unusable response: {0}")]
    MalformedResponse(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl RelayError {
    /// Status code reported to the caller of the relay.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. The timeout case omits the endpoint.
    pub fn message(&self) -> String {
        match self {
            RelayError::Timeout { .. } => {
                "The AI worker took too long to respond. Try fewer images or retry later.".to_string()
            }
            other => other.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RelayError::Timeout { .. } => "timeout",
            RelayError::Status { .. } => "status",
            RelayError::Connect(_) => "connect",
            RelayError::MalformedResponse(_) => "malformed",
            RelayError::Client(_) => "client",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({ "message": self.message() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let client = WorkerClient::new("https://abc.ngrok-free.app/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "https://abc.ngrok-free.app/generate_dataset");
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = RelayError::Timeout {
            endpoint: "http://w/generate_dataset".into(),
        };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.message().contains("too long"));
    }

    #[test]
    fn status_error_mentions_remote_status() {
        let err = RelayError::Status {
            status: 503,
            body: "overloaded".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("503"));
        assert!(err.message().contains("overloaded"));
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), BODY_EXCERPT_LEN + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("  short \n"), "short");
    }
}
