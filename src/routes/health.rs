use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
}

/// GET / — liveness acknowledgment. Does not contact the remote worker.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        message: "SynthMed relay is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}
