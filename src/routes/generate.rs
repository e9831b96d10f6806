use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::generation::GenerationRequest;
use crate::routes::error::ApiError;

/// POST /generate_dataset — relay a dataset request to the remote worker.
///
/// Invalid input is answered with 422 before any outbound call. Worker
/// failures map to 504 (wait exceeded) or 500 (everything else).
pub async fn generate_dataset(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Response {
    metrics::counter!("generation_requests_total").increment(1);

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected malformed generation request");
            return ApiError::from(rejection).into_response();
        }
    };

    if let Err(report) = request.validate() {
        tracing::warn!(error = %report, "Rejected invalid generation request");
        return ApiError::from(report).into_response();
    }

    tracing::info!(
        age = request.age,
        view = %request.view,
        severity = %request.severity,
        findings = ?request.finding,
        num_images = request.num_images,
        "Received generation request"
    );

    match state.relay.generate(&request).await {
        Ok(response) => (
            [(header::CONTENT_TYPE, "application/json")],
            response.into_bytes(),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
