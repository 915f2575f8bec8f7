//! RPC-style read API.
//!
//! `GET /api/analytics?courseid=<id>&userid=<optional>` returns the
//! per-user analytics sequence in the standard response envelope.

use crate::response::{fault, ApiResponse};
use crate::state::{acting_user, AppState};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use courselens_core::report;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub courseid: i64,
    #[serde(default)]
    pub userid: i64,
}

pub async fn get_comprehensive_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> Response {
    let acting = match acting_user(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection.into_response(),
    };
    if let Err(err) = report::require_view_capability(&state.db, query.courseid, acting) {
        return fault(err).into_response();
    }

    match report::get_comprehensive_analytics(
        &state.db,
        &state.engine,
        query.courseid,
        query.userid,
    ) {
        Ok(result) => Json(ApiResponse::success(
            result.users,
            "Analytics fetched successfully",
        ))
        .into_response(),
        Err(err) => fault(err).into_response(),
    }
}
