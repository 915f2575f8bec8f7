//! Live-session adapter (BigBlueButton, Zoom)
//!
//! Both conferencing plugins are optional; either contributes its own
//! sub-map when installed. Punctuality is the share of join events that
//! were on time, as a percentage.

use super::clamp_pct;
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{BigBlueButtonMetrics, PartialRecord, ZoomMetrics};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct LiveSessionAdapter;

impl DataSourceAdapter for LiveSessionAdapter {
    fn name(&self) -> &'static str {
        "core.live_sessions"
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

        // BigBlueButton sessions
        if ctx.sources.has("bigbluebuttonbn_logs") {
            let sql = format!(
                r#"
                SELECT bl.userid, bl.bigbluebuttonbnid,
                       COUNT(bl.id) AS sessions_attended,
                       SUM(bl.duration) AS total_minutes,
                       AVG(CASE WHEN bl.event = 'meeting_joined'
                                THEN 1.0 ELSE 0.0 END) AS punctuality_rate,
                       COUNT(CASE WHEN bl.event = 'poll_answered'
                                  THEN bl.id END) AS polls_answered,
                       COUNT(CASE WHEN bl.event = 'hand_raised'
                                  THEN bl.id END) AS hands_raised
                FROM bigbluebuttonbn_logs bl
                JOIN bigbluebuttonbn bbb ON bl.bigbluebuttonbnid = bbb.id
                WHERE bbb.course = ? AND bl.userid IN ({marks})
                GROUP BY bl.userid, bl.bigbluebuttonbnid
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, i64>("bigbluebuttonbnid")?,
                            row.get::<_, i64>("sessions_attended")?,
                            row.get::<_, Option<i64>>("total_minutes")?,
                            row.get::<_, Option<f64>>("punctuality_rate")?,
                            row.get::<_, i64>("polls_answered")?,
                            row.get::<_, i64>("hands_raised")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, session_id, attended, minutes, punctuality, polls, hands) in rows {
                partials.entry(user_id).or_default().bigbluebutton.insert(
                    session_id,
                    BigBlueButtonMetrics {
                        sessions_attended: attended,
                        total_minutes: minutes.unwrap_or(0),
                        punctuality_rate: clamp_pct(punctuality.unwrap_or(0.0) * 100.0),
                        polls_answered: polls,
                        hands_raised: hands,
                    },
                );
            }
        }

        // Zoom sessions
        if ctx.sources.has("zoom_meeting_participants") {
            let sql = format!(
                r#"
                SELECT zmp.userid, zmp.meetingid,
                       COUNT(zmp.id) AS sessions_attended,
                       SUM(zmp.duration) AS total_minutes,
                       AVG(CASE WHEN zmp.join_time <= zmp.start_time
                                THEN 1.0 ELSE 0.0 END) AS punctuality_rate
                FROM zoom_meeting_participants zmp
                JOIN zoom z ON zmp.meetingid = z.id
                WHERE z.course = ? AND zmp.userid IN ({marks})
                GROUP BY zmp.userid, zmp.meetingid
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, i64>("meetingid")?,
                            row.get::<_, i64>("sessions_attended")?,
                            row.get::<_, Option<i64>>("total_minutes")?,
                            row.get::<_, Option<f64>>("punctuality_rate")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, meeting_id, attended, minutes, punctuality) in rows {
                partials.entry(user_id).or_default().zoom.insert(
                    meeting_id,
                    ZoomMetrics {
                        sessions_attended: attended,
                        total_minutes: minutes.unwrap_or(0),
                        punctuality_rate: clamp_pct(punctuality.unwrap_or(0.0) * 100.0),
                    },
                );
            }
        }

        Ok(partials)
    }
}
