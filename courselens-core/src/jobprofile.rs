//! Weighted-skill job-profile calculator
//!
//! A per-course table of skills with a weight and up to three measured
//! components (system, assignment, instructor). The derived columns:
//!
//! - user grade = mean of the components that are present; `-` and empty
//!   cells are absent, not zero
//! - user skill = weight × user grade / 100, rounded to 1 decimal
//!
//! Rows persist as one JSON blob per course in plugin config, overwritten
//! whole on every save. A malformed blob falls back to the built-in
//! default dataset instead of faulting.

use crate::db::Database;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Plugin namespace in the config store.
const CONFIG_PLUGIN: &str = "report_jobprofile";

/// One editable row of the job-profile table.
///
/// Percent columns are stored as display strings (`"60%"`, `"-"`); the
/// derived columns are recomputed and rewritten on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRow {
    pub skill: String,
    pub weight: String,
    pub system: String,
    pub assignment: String,
    pub instructor: String,
    #[serde(default)]
    pub usergrade: String,
    #[serde(default)]
    pub userskill: String,
}

impl SkillRow {
    pub fn new(
        skill: &str,
        weight: &str,
        system: &str,
        assignment: &str,
        instructor: &str,
    ) -> Self {
        Self {
            skill: skill.to_string(),
            weight: weight.to_string(),
            system: system.to_string(),
            assignment: assignment.to_string(),
            instructor: instructor.to_string(),
            usergrade: String::new(),
            userskill: String::new(),
        }
    }
}

/// Derived columns for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowDerived {
    pub user_grade: f64,
    pub user_skill: f64,
}

/// Parse a percent cell. Empty and `-` are absent, not zero.
pub fn parse_percent(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        return None;
    }
    let value = value.strip_suffix('%').unwrap_or(value);
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != ' ').collect();
    Some(cleaned.parse::<f64>().unwrap_or(0.0))
}

/// Compute the derived columns for one row.
pub fn compute_row(row: &SkillRow) -> RowDerived {
    let components: Vec<f64> = [&row.system, &row.assignment, &row.instructor]
        .into_iter()
        .filter_map(|c| parse_percent(c))
        .collect();
    let user_grade = if components.is_empty() {
        0.0
    } else {
        components.iter().sum::<f64>() / components.len() as f64
    };
    let user_skill = match parse_percent(&row.weight) {
        Some(weight) => ((weight * user_grade / 100.0) * 10.0).round() / 10.0,
        None => 0.0,
    };
    RowDerived {
        user_grade,
        user_skill,
    }
}

/// Format a numeric percent for display (`decimals` fractional digits).
pub fn format_percent(value: f64, decimals: usize) -> String {
    if decimals == 0 {
        format!("{}%", value.round() as i64)
    } else {
        format!("{:.*}%", decimals, value)
    }
}

/// Normalize an input percent cell: absent stays `-`, anything else gets
/// its `%` suffix ensured.
pub fn normalize_percent_str(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        return "-".to_string();
    }
    format!("{}%", value.trim_end_matches('%'))
}

/// Sum of user-skill values across rows (the table footer).
pub fn total_user_skill(rows: &[SkillRow]) -> f64 {
    rows.iter().map(|row| compute_row(row).user_skill).sum()
}

/// The built-in dataset used until a course saves its own.
pub fn default_dataset() -> Vec<SkillRow> {
    vec![
        SkillRow::new("Organizational Skills", "10%", "60%", "-", "40%"),
        SkillRow::new("Communication Skills", "5%", "-", "60%", "40%"),
        SkillRow::new("Collaboration", "5%", "-", "80%", "20%"),
        SkillRow::new("Stress Management", "5%", "80%", "20%", "-"),
        SkillRow::new("", "3%", "-", "-", "100%"),
        SkillRow::new("", "-", "20%", "80%", "80%"),
    ]
    .into_iter()
    .map(with_derived)
    .collect()
}

/// Recompute and format a row's derived columns.
fn with_derived(row: SkillRow) -> SkillRow {
    let derived = compute_row(&row);
    SkillRow {
        skill: row.skill,
        weight: normalize_percent_str(&row.weight),
        system: normalize_percent_str(&row.system),
        assignment: normalize_percent_str(&row.assignment),
        instructor: normalize_percent_str(&row.instructor),
        usergrade: format_percent(derived.user_grade, 0),
        userskill: format_percent(derived.user_skill, 1),
    }
}

fn config_key(course_id: i64) -> String {
    format!("data_{}", course_id)
}

/// Load the job-profile rows for a course.
///
/// Missing or malformed stored JSON yields the default dataset.
pub fn load(db: &Database, course_id: i64) -> Result<Vec<SkillRow>> {
    let Some(raw) = db.get_plugin_config(CONFIG_PLUGIN, &config_key(course_id))? else {
        return Ok(default_dataset());
    };
    match serde_json::from_str::<Vec<SkillRow>>(&raw) {
        Ok(rows) => Ok(rows),
        Err(e) => {
            tracing::warn!(
                course_id,
                error = %e,
                "Malformed job-profile blob, using defaults"
            );
            Ok(default_dataset())
        }
    }
}

/// Save rows for a course: recompute derived columns, normalize percent
/// cells, and overwrite the stored blob. Returns the normalized rows.
pub fn save(db: &Database, course_id: i64, rows: Vec<SkillRow>) -> Result<Vec<SkillRow>> {
    let normalized: Vec<SkillRow> = rows.into_iter().map(with_derived).collect();
    let blob = serde_json::to_string(&normalized)?;
    db.set_plugin_config(CONFIG_PLUGIN, &config_key(course_id), &blob)?;
    Ok(normalized)
}
