//! Liveness probe.

use crate::response::ApiResponse;
use axum::{response::IntoResponse, Json};

/// GET /health
///
/// Returns a simple success response to indicate the API is running.
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK", "Health check passed"))
}
