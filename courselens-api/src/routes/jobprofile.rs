//! Job-profile rows: read and save the per-course weighted-skill table.
//!
//! `GET /jobprofile?id=<courseid>` returns the stored rows (or the
//! default dataset). `POST /jobprofile?id=<courseid>` recomputes the
//! derived columns and overwrites the whole blob.

use crate::response::{fault, ApiResponse};
use crate::state::{acting_user, AppState};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use courselens_core::jobprofile::{self, SkillRow};
use courselens_core::report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct JobProfileQuery {
    pub id: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct JobProfileData {
    pub rows: Vec<SkillRow>,
    pub total_userskill: String,
}

fn guarded(
    state: &AppState,
    headers: &HeaderMap,
    course_id: i64,
) -> Result<(), Response> {
    let acting = acting_user(headers).map_err(IntoResponse::into_response)?;
    report::require_view_capability(&state.db, course_id, acting)
        .map_err(|err| fault(err).into_response())?;
    state
        .db
        .require_course(course_id)
        .map(|_| ())
        .map_err(|err| fault(err).into_response())
}

fn payload(rows: Vec<SkillRow>) -> JobProfileData {
    let total = jobprofile::total_user_skill(&rows);
    JobProfileData {
        rows,
        total_userskill: jobprofile::format_percent(total, 1),
    }
}

pub async fn get_rows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<JobProfileQuery>,
) -> Response {
    if let Err(rejection) = guarded(&state, &headers, query.id) {
        return rejection;
    }
    match jobprofile::load(&state.db, query.id) {
        Ok(rows) => Json(ApiResponse::success(
            payload(rows),
            "Job profile fetched successfully",
        ))
        .into_response(),
        Err(err) => fault(err).into_response(),
    }
}

pub async fn save_rows(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<JobProfileQuery>,
    Json(rows): Json<Vec<SkillRow>>,
) -> Response {
    if let Err(rejection) = guarded(&state, &headers, query.id) {
        return rejection;
    }
    match jobprofile::save(&state.db, query.id, rows) {
        Ok(saved) => {
            Json(ApiResponse::success(payload(saved), "Changes saved")).into_response()
        }
        Err(err) => fault(err).into_response(),
    }
}
