//! The web report surface.
//!
//! `GET /report?id=<courseid>&userid=<optional>&format=html|json|csv`
//!
//! - `html`: the rendered dashboard
//! - `json`: the raw per-user record mapping
//! - `csv`: an attachment download named
//!   `analytics_<shortname>_<timestamp>.csv`

use crate::response::{fault, ApiResponse};
use crate::state::{acting_user, AppState};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use courselens_core::export;
use courselens_core::report;
use courselens_core::types::{AnalyticsRecord, UserRow};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

fn default_format() -> String {
    "html".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub id: i64,
    #[serde(default)]
    pub userid: i64,
    #[serde(default = "default_format")]
    pub format: String,
}

pub async fn report_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Response {
    let acting = match acting_user(&headers) {
        Ok(user) => user,
        Err(rejection) => return rejection.into_response(),
    };
    if let Err(err) = report::require_view_capability(&state.db, query.id, acting) {
        return fault(err).into_response();
    }

    let result =
        match report::get_comprehensive_analytics(&state.db, &state.engine, query.id, query.userid)
        {
            Ok(result) => result,
            Err(err) => return fault(err).into_response(),
        };

    let users: Vec<UserRow> = result
        .users
        .iter()
        .map(|u| UserRow {
            id: u.userid,
            firstname: u.firstname.clone(),
            lastname: u.lastname.clone(),
            email: u.email.clone(),
        })
        .collect();
    let records: BTreeMap<i64, AnalyticsRecord> = result
        .users
        .into_iter()
        .map(|u| (u.userid, u.analytics))
        .collect();

    match query.format.as_str() {
        "html" => {
            Html(export::dashboard::render_dashboard(&result.course, &users, &records))
                .into_response()
        }
        "json" => match export::to_summary(&records) {
            Ok(summary) => Json(summary).into_response(),
            Err(err) => fault(err).into_response(),
        },
        "csv" => {
            let rows = export::to_rows(&users, &records);
            let mut buffer = Vec::new();
            if let Err(err) = export::write_csv(&mut buffer, &rows) {
                return fault(err).into_response();
            }
            let filename = export::csv_filename(&result.course.shortname, Utc::now());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                buffer,
            )
                .into_response()
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(format!(
                "Unknown format: {}",
                other
            ))),
        )
            .into_response(),
    }
}
