//! Route groups for the report surface.

pub mod analytics;
pub mod health;
pub mod jobprofile;
pub mod report;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/report", get(report::report_view))
        .route("/api/analytics", get(analytics::get_comprehensive_analytics))
        .route(
            "/jobprofile",
            get(jobprofile::get_rows).post(jobprofile::save_rows),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
