//! Attendance adapter
//!
//! Uses course-module completion tracking as an attendance proxy. This is
//! a known semantic mismatch inherited from the host platform: completion
//! records when an activity was finished, not when the student was in the
//! room. Flag to the system owner before treating these figures as real
//! attendance.

use super::percent;
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{AttendanceMetrics, PartialRecord};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct AttendanceAdapter;

impl DataSourceAdapter for AttendanceAdapter {
    fn name(&self) -> &'static str {
        "core.attendance"
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

        let sql = format!(
            r#"
            SELECT cmc.userid, cm.id AS cmid, m.name AS modulename,
                   COUNT(CASE WHEN cmc.completionstate = 1 THEN cmc.id END) AS attended_count,
                   COUNT(cmc.id) AS total_sessions,
                   MAX(cmc.timemodified) AS last_attendance
            FROM course_modules_completion cmc
            JOIN course_modules cm ON cmc.coursemoduleid = cm.id
            JOIN modules m ON cm.module = m.id
            WHERE cm.course = ? AND cmc.userid IN ({marks})
            GROUP BY cmc.userid, cm.id, m.name
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("cmid")?,
                        row.get::<_, String>("modulename")?,
                        row.get::<_, i64>("attended_count")?,
                        row.get::<_, i64>("total_sessions")?,
                        row.get::<_, i64>("last_attendance")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, cm_id, module_name, attended, total, last) in rows {
            partials.entry(user_id).or_default().attendance.insert(
                cm_id,
                AttendanceMetrics {
                    module_name,
                    attendance_rate: percent(attended, total),
                    // Completion tracking carries no per-session check-in
                    // times, so lateness and streaks cannot be derived.
                    late_count: 0,
                    absence_count: total - attended,
                    attendance_streak: 0,
                    last_attendance: last,
                },
            );
        }

        Ok(partials)
    }
}
