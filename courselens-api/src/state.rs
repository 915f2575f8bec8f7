//! Shared application state for the report surface.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use courselens_core::analytics::AggregationEngine;
use courselens_core::Database;

use crate::response::ApiResponse;

/// State shared by every route: the snapshot database and the adapter
/// engine, both request-independent.
pub struct AppState {
    pub db: Database,
    pub engine: AggregationEngine,
}

/// The acting user, as asserted by the host platform's auth layer.
///
/// The host fronts authentication and forwards the authenticated user id
/// in `X-User-Id`; this service only performs the capability check.
pub fn acting_user(headers: &HeaderMap) -> Result<i64, (StatusCode, Json<ApiResponse<()>>)> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Missing or invalid X-User-Id header")),
        ))
}
