//! Interactive-content adapter (H5P, video, SCORM)
//!
//! H5P and SCORM live in optional plugin tables and contribute only when
//! installed; video engagement is derived from the core activity log.

use super::{clamp_pct, round2};
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{H5pMetrics, PartialRecord, ScormMetrics, VideoMetrics};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct InteractiveContentAdapter;

impl DataSourceAdapter for InteractiveContentAdapter {
    fn name(&self) -> &'static str {
        "core.interactive_content"
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

        // H5P interactions
        if ctx.sources.has("hvp_content_user_data") {
            let sql = format!(
                r#"
                SELECT hud.user_id AS userid, hc.id AS contentid, hc.title,
                       COUNT(hud.id) AS interaction_count,
                       AVG(hud.data) AS avg_interaction_score,
                       MAX(hud.timestamp) AS last_interaction
                FROM hvp_content_user_data hud
                JOIN hvp_content hc ON hud.content_id = hc.id
                WHERE hc.course = ? AND hud.user_id IN ({marks})
                GROUP BY hud.user_id, hc.id, hc.title
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, i64>("contentid")?,
                            row.get::<_, String>("title")?,
                            row.get::<_, i64>("interaction_count")?,
                            row.get::<_, Option<f64>>("avg_interaction_score")?,
                            row.get::<_, i64>("last_interaction")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, content_id, title, count, avg_score, last) in rows {
                partials.entry(user_id).or_default().h5p.insert(
                    content_id,
                    H5pMetrics {
                        title,
                        interaction_count: count,
                        avg_interaction_score: round2(avg_score.unwrap_or(0.0)),
                        last_interaction: last,
                    },
                );
            }
        }

        // Video completion from the activity log
        let sql = format!(
            r#"
            SELECT l.userid, cm.instance AS videoid,
                   COUNT(l.id) AS view_count,
                   MAX(l.timecreated) AS last_view,
                   AVG(CASE WHEN l.action = 'viewed' THEN 1.0 ELSE 0.0 END) AS completion_rate
            FROM logstore_standard_log l
            JOIN course_modules cm ON l.contextinstanceid = cm.id
            JOIN modules m ON cm.module = m.id
            WHERE l.courseid = ? AND l.userid IN ({marks})
              AND m.name IN ('video', 'hvp', 'scorm')
            GROUP BY l.userid, cm.instance
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("videoid")?,
                        row.get::<_, i64>("view_count")?,
                        row.get::<_, i64>("last_view")?,
                        row.get::<_, Option<f64>>("completion_rate")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, video_id, views, last, rate) in rows {
            partials.entry(user_id).or_default().video.insert(
                video_id,
                VideoMetrics {
                    view_count: views,
                    completion_rate: clamp_pct(rate.unwrap_or(0.0) * 100.0),
                    last_view: last,
                },
            );
        }

        // SCORM interactions
        if ctx.sources.has("scorm_scoes_track") {
            let sql = format!(
                r#"
                SELECT st.userid, st.scormid,
                       COUNT(st.id) AS interaction_count,
                       AVG(CASE WHEN st.element = 'cmi.core.score.raw'
                                THEN st.value END) AS avg_score,
                       MAX(st.timemodified) AS last_interaction
                FROM scorm_scoes_track st
                JOIN scorm s ON st.scormid = s.id
                WHERE s.course = ? AND st.userid IN ({marks})
                GROUP BY st.userid, st.scormid
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, i64>("scormid")?,
                            row.get::<_, i64>("interaction_count")?,
                            row.get::<_, Option<f64>>("avg_score")?,
                            row.get::<_, i64>("last_interaction")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, scorm_id, count, avg_score, last) in rows {
                partials.entry(user_id).or_default().scorm.insert(
                    scorm_id,
                    ScormMetrics {
                        interaction_count: count,
                        avg_score: round2(avg_score.unwrap_or(0.0)),
                        last_interaction: last,
                    },
                );
            }
        }

        Ok(partials)
    }
}
