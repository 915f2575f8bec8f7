//! Behavioral-quality adapter
//!
//! Scalar per-user aggregates: deadline adherence over submitted work,
//! learning pace from the activity log, and plagiarism-scan results when
//! that plugin is installed.

use super::{percent, round2};
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{AcademicIntegrity, LearningPace, PartialRecord};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct BehavioralAdapter;

impl DataSourceAdapter for BehavioralAdapter {
    fn name(&self) -> &'static str {
        "core.behavioral"
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

        // Deadline adherence over submitted work
        let sql = format!(
            r#"
            SELECT s.userid,
                   CASE WHEN a.duedate = 0 OR s.timemodified <= a.duedate
                        THEN 1 ELSE 0 END AS ontime
            FROM assign_submission s
            JOIN assign a ON s.assignment = a.id
            WHERE a.course = ? AND s.userid IN ({marks}) AND s.status = 'submitted'
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| Ok((row.get::<_, i64>("userid")?, row.get::<_, i64>("ontime")?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut deadline_stats: HashMap<i64, (i64, i64)> = HashMap::new();
        for (user_id, ontime) in rows {
            let entry = deadline_stats.entry(user_id).or_insert((0, 0));
            entry.0 += ontime;
            entry.1 += 1;
        }
        for (user_id, (ontime, total)) in deadline_stats {
            partials.entry(user_id).or_default().deadline_adherence =
                Some(percent(ontime, total));
        }

        // Learning pace: average gap between activities, and active days
        let sql = format!(
            r#"
            SELECT userid, AVG(gap_seconds / 3600.0) AS avg_pace_hours
            FROM (
                SELECT userid,
                       timecreated - LAG(timecreated) OVER (
                           PARTITION BY userid ORDER BY timecreated
                       ) AS gap_seconds
                FROM logstore_standard_log
                WHERE courseid = ? AND userid IN ({marks})
            )
            GROUP BY userid
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let pace_rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, Option<f64>>("avg_pace_hours")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let sql = format!(
            r#"
            SELECT userid,
                   COUNT(DISTINCT date(timecreated, 'unixepoch')) AS active_days
            FROM logstore_standard_log
            WHERE courseid = ? AND userid IN ({marks})
            GROUP BY userid
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let day_rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("active_days")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let active_days: HashMap<i64, i64> = day_rows.into_iter().collect();

        for (user_id, pace) in pace_rows {
            partials.entry(user_id).or_default().learning_pace = Some(LearningPace {
                avg_pace_hours: round2(pace.unwrap_or(0.0)),
                active_days: active_days.get(&user_id).copied().unwrap_or(0),
            });
        }

        // Academic integrity (similarity index, if the scanner is installed)
        if ctx.sources.has("plagiarism_plagscan_doc") {
            let sql = format!(
                r#"
                SELECT pd.userid,
                       AVG(pd.similarityscore) AS avg_similarity,
                       COUNT(pd.id) AS submissions_checked
                FROM plagiarism_plagscan_doc pd
                JOIN course_modules cm ON pd.cm = cm.id
                WHERE cm.course = ? AND pd.userid IN ({marks})
                GROUP BY pd.userid
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, Option<f64>>("avg_similarity")?,
                            row.get::<_, i64>("submissions_checked")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, similarity, checked) in rows {
                partials.entry(user_id).or_default().academic_integrity =
                    Some(AcademicIntegrity {
                        avg_similarity: round2(similarity.unwrap_or(0.0)),
                        submissions_checked: checked,
                    });
            }
        }

        Ok(partials)
    }
}
