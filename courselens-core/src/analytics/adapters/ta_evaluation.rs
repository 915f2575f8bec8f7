//! TA / instructor evaluation adapter
//!
//! Per grade-item instance: average rating, how many gradings carried
//! written feedback, and how long that feedback ran.

use super::round2;
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{PartialRecord, TaEvaluationMetrics};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct TaEvaluationAdapter;

impl DataSourceAdapter for TaEvaluationAdapter {
    fn name(&self) -> &'static str {
        "core.ta_evaluation"
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
            SELECT g.userid, gi.iteminstance, gi.itemmodule,
                   AVG(g.finalgrade) AS avg_ta_rating,
                   COUNT(CASE WHEN g.feedback IS NOT NULL AND LENGTH(g.feedback) > 0
                              THEN g.id END) AS feedback_count,
                   AVG(LENGTH(g.feedback)) AS avg_feedback_length
            FROM grade_grades g
            JOIN grade_items gi ON g.itemid = gi.id
            WHERE gi.courseid = ? AND g.userid IN ({marks})
            GROUP BY g.userid, gi.iteminstance, gi.itemmodule
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, Option<i64>>("iteminstance")?,
                        row.get::<_, Option<String>>("itemmodule")?,
                        row.get::<_, Option<f64>>("avg_ta_rating")?,
                        row.get::<_, i64>("feedback_count")?,
                        row.get::<_, Option<f64>>("avg_feedback_length")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, instance, module, rating, feedback_count, feedback_length) in rows {
            // Course-total grade items have no instance to key on
            let Some(instance) = instance else { continue };
            partials.entry(user_id).or_default().ta_evaluation.insert(
                instance,
                TaEvaluationMetrics {
                    module: module.unwrap_or_default(),
                    avg_ta_rating: round2(rating.unwrap_or(0.0)),
                    feedback_count,
                    avg_feedback_length: round2(feedback_length.unwrap_or(0.0)),
                },
            );
        }

        Ok(partials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::engine::SourceAvailability;
    use crate::db::Database;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(10, "CS101", "Intro to CS").unwrap();
        db.insert_user(1, "Gil", "Graded", "gil@example.org").unwrap();
        db.enrol_user(10, 1).unwrap();
        db.insert_grade_item(200, 10, "mod", Some("assign"), Some(100))
            .unwrap();
        db
    }

    fn collect(db: &Database, user_ids: &[i64]) -> HashMap<i64, PartialRecord> {
        let sources = SourceAvailability::probe(db).unwrap();
        let ctx = CollectContext { db, sources: &sources };
        TaEvaluationAdapter.collect(10, user_ids, &ctx).unwrap()
    }

    #[test]
    fn test_rating_and_feedback_stats() {
        let db = seeded_db();
        db.insert_grade(200, 1, Some(80.0), 100.0, Some("Good work here"))
            .unwrap();
        db.insert_grade(200, 1, Some(60.0), 100.0, None).unwrap();

        let partials = collect(&db, &[1]);
        let ta = &partials[&1].ta_evaluation[&100];
        assert_eq!(ta.module, "assign");
        assert!((ta.avg_ta_rating - 70.0).abs() < 0.001);
        assert_eq!(ta.feedback_count, 1);
        // avg over the one non-null feedback text
        assert!((ta.avg_feedback_length - 14.0).abs() < 0.001);
    }

    #[test]
    fn test_course_total_items_skipped() {
        let db = seeded_db();
        db.insert_grade_item(201, 10, "course", None, None).unwrap();
        db.insert_grade(201, 1, Some(75.0), 100.0, None).unwrap();

        let partials = collect(&db, &[1]);
        assert!(partials.get(&1).map_or(true, |p| !p
            .ta_evaluation
            .contains_key(&0)));
    }
}
