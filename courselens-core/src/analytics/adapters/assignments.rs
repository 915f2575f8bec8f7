//! Assignment adapter
//!
//! Three passes over the grading tables:
//! 1. Per-assignment cohort aggregates (average grade %, on-time rate,
//!    late/submitted counts) over the requested user set, replicated to
//!    every requested user.
//! 2. Per-user resubmission counts: submitted attempts minus one,
//!    reported only when there was more than one attempt.
//! 3. Per-user feedback richness: average feedback length and the number
//!    of feedback texts longer than the rich threshold.
//!
//! A module with no due date treats every submission as on-time.

use super::{clamp_pct, percent, round2};
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{AssignmentMetrics, FeedbackRichness, PartialRecord};
use rusqlite::params_from_iter;
use std::collections::HashMap;

/// Feedback longer than this many characters counts as rich.
const RICH_FEEDBACK_MIN_CHARS: i64 = 100;

pub struct AssignmentAdapter;

impl DataSourceAdapter for AssignmentAdapter {
    fn name(&self) -> &'static str {
        "core.assignments"
    }

    fn collect(
        &self,
        course_id: i64,
        user_ids: &[i64],
        ctx: &CollectContext,
    ) -> Result<HashMap<i64, PartialRecord>> {
        let mut partials: HashMap<i64, PartialRecord> = HashMap::new();
        let conn = ctx.db.connection();
        let marks = in_placeholders(user_ids.len());

        // Cohort aggregates per assignment
        let sql = format!(
            r#"
            SELECT a.id AS assignid, a.name,
                   AVG(CASE WHEN g.finalgrade IS NOT NULL
                            THEN (g.finalgrade / g.rawgrademax) * 100 ELSE 0 END) AS avg_grade_pct,
                   COUNT(s.id) AS total_submissions,
                   COUNT(CASE WHEN a.duedate = 0 OR s.timemodified <= a.duedate
                              THEN s.id END) AS ontime_submissions,
                   COUNT(CASE WHEN a.duedate > 0 AND s.timemodified > a.duedate
                              THEN s.id END) AS late_submissions,
                   COUNT(CASE WHEN s.status = 'submitted' THEN s.id END) AS submitted_count
            FROM assign a
            LEFT JOIN assign_submission s
                   ON a.id = s.assignment AND s.userid IN ({marks})
            LEFT JOIN grade_grades g
                   ON g.itemid = (
                        SELECT gi.id FROM grade_items gi
                        WHERE gi.itemtype = 'mod' AND gi.itemmodule = 'assign'
                          AND gi.iteminstance = a.id AND gi.courseid = a.course
                   ) AND g.userid = s.userid
            WHERE a.course = ?
            GROUP BY a.id, a.name
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter(user_ids.iter().copied().chain([course_id])),
                |row| {
                    let assign_id: i64 = row.get("assignid")?;
                    let name: String = row.get("name")?;
                    let avg_grade_pct: Option<f64> = row.get("avg_grade_pct")?;
                    let total: i64 = row.get("total_submissions")?;
                    let ontime: i64 = row.get("ontime_submissions")?;
                    let late: i64 = row.get("late_submissions")?;
                    let submitted: i64 = row.get("submitted_count")?;
                    Ok((assign_id, name, avg_grade_pct, total, ontime, late, submitted))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (assign_id, name, avg_grade_pct, total, ontime, late, submitted) in rows {
            let metrics = AssignmentMetrics {
                name,
                avg_grade_pct: clamp_pct(avg_grade_pct.unwrap_or(0.0)),
                ontime_submission_rate: percent(ontime, total),
                late_submissions: late,
                submitted_count: submitted,
                resubmission_count: None,
                feedback: None,
            };
            for user_id in user_ids {
                partials
                    .entry(*user_id)
                    .or_default()
                    .assignments
                    .insert(assign_id, metrics.clone());
            }
        }

        // Resubmission count per user
        let sql = format!(
            r#"
            SELECT s.userid, s.assignment, COUNT(s.id) - 1 AS resubmission_count
            FROM assign_submission s
            JOIN assign a ON a.id = s.assignment
            WHERE a.course = ? AND s.userid IN ({marks}) AND s.status = 'submitted'
            GROUP BY s.userid, s.assignment
            HAVING COUNT(s.id) > 1
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("assignment")?,
                        row.get::<_, i64>("resubmission_count")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, assign_id, count) in rows {
            partials
                .entry(user_id)
                .or_default()
                .resubmission_counts
                .insert(assign_id, count);
        }

        // Feedback richness (length of feedback text)
        let sql = format!(
            r#"
            SELECT g.userid, gi.iteminstance AS assignid,
                   AVG(LENGTH(g.feedback)) AS avg_feedback_length,
                   COUNT(CASE WHEN LENGTH(g.feedback) > {RICH_FEEDBACK_MIN_CHARS}
                              THEN g.id END) AS rich_feedback_count
            FROM grade_grades g
            JOIN grade_items gi ON g.itemid = gi.id
            WHERE gi.courseid = ? AND gi.itemtype = 'mod' AND gi.itemmodule = 'assign'
              AND g.userid IN ({marks}) AND g.feedback IS NOT NULL
            GROUP BY g.userid, gi.iteminstance
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("assignid")?,
                        row.get::<_, Option<f64>>("avg_feedback_length")?,
                        row.get::<_, i64>("rich_feedback_count")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, assign_id, avg_length, rich_count) in rows {
            partials.entry(user_id).or_default().feedback_richness.insert(
                assign_id,
                FeedbackRichness {
                    avg_length: round2(avg_length.unwrap_or(0.0)),
                    rich_count,
                },
            );
        }

        Ok(partials)
    }
}
