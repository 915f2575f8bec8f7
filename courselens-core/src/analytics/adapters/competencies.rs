//! Competency-framework adapter
//!
//! Requires the competency plugin tables. Evidence counts arrive in a
//! second pass and attach only to competencies the user already holds a
//! rating record for.

use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{CompetencyMetrics, EvidenceContribution, PartialRecord};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct CompetencyAdapter;

impl DataSourceAdapter for CompetencyAdapter {
    fn name(&self) -> &'static str {
        "core.competencies"
    }

    fn required_tables(&self) -> &'static [&'static str] {
        &["competency", "competency_usercomp"]
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

        // Competency ratings and levels
        let sql = format!(
            r#"
            SELECT cuc.userid, c.id AS competencyid, c.shortname, c.description,
                   cuc.grade, cuc.proficiency, cuc.status,
                   cuc.timecreated, cuc.timemodified
            FROM competency_usercomp cuc
            JOIN competency c ON cuc.competencyid = c.id
            WHERE c.courseid = ? AND cuc.userid IN ({marks})
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("competencyid")?,
                        row.get::<_, String>("shortname")?,
                        row.get::<_, Option<String>>("description")?,
                        row.get::<_, Option<f64>>("grade")?,
                        row.get::<_, i64>("proficiency")?,
                        row.get::<_, i64>("status")?,
                        row.get::<_, i64>("timecreated")?,
                        row.get::<_, i64>("timemodified")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, competency_id, shortname, description, grade, proficiency, status, created, modified) in
            rows
        {
            partials.entry(user_id).or_default().competencies.insert(
                competency_id,
                CompetencyMetrics {
                    shortname,
                    description: description.unwrap_or_default(),
                    rating: grade.unwrap_or(0.0),
                    proficiency_achieved: proficiency != 0,
                    status,
                    date_achieved: created,
                    last_updated: modified,
                    evidence_count: None,
                    last_evidence: None,
                },
            );
        }

        // Evidence count per competency (user-scoped, as the host stores it)
        if ctx.sources.has("competency_evidence") {
            let sql = format!(
                r#"
                SELECT ce.userid, ce.competencyid,
                       COUNT(ce.id) AS evidence_count,
                       MAX(ce.timemodified) AS last_evidence
                FROM competency_evidence ce
                WHERE ce.userid IN ({marks})
                GROUP BY ce.userid, ce.competencyid
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(user_ids.iter().copied()), |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("competencyid")?,
                        row.get::<_, i64>("evidence_count")?,
                        row.get::<_, i64>("last_evidence")?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, competency_id, count, last) in rows {
                partials
                    .entry(user_id)
                    .or_default()
                    .evidence
                    .insert(competency_id, EvidenceContribution { count, last });
            }
        }

        Ok(partials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::engine::{AggregationEngine, SourceAvailability};
    use crate::db::{Database, OptionalSource};
    use rusqlite::params;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(10, "CS101", "Intro to CS").unwrap();
        db.insert_user(1, "Cal", "Capable", "cal@example.org").unwrap();
        db.enrol_user(10, 1).unwrap();
        db.install_optional_source(OptionalSource::Competency).unwrap();
        {
            let conn = db.connection();
            conn.execute(
                "INSERT INTO competency (id, courseid, shortname, description)
                 VALUES (1, 10, 'problem-solving', 'Solves problems')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO competency_usercomp
                     (competencyid, userid, grade, proficiency, status, timecreated, timemodified)
                 VALUES (1, 1, 3.0, 1, 2, 1000, 2000)",
                [],
            )
            .unwrap();
        }
        db
    }

    fn collect(db: &Database, user_ids: &[i64]) -> HashMap<i64, PartialRecord> {
        let sources = SourceAvailability::probe(db).unwrap();
        let ctx = CollectContext { db, sources: &sources };
        CompetencyAdapter.collect(10, user_ids, &ctx).unwrap()
    }

    #[test]
    fn test_competency_ratings() {
        let db = seeded_db();
        let partials = collect(&db, &[1]);
        let competency = &partials[&1].competencies[&1];
        assert_eq!(competency.shortname, "problem-solving");
        assert!((competency.rating - 3.0).abs() < 0.001);
        assert!(competency.proficiency_achieved);
        assert_eq!(competency.status, 2);
        assert_eq!(competency.date_achieved, 1000);
        assert_eq!(competency.last_updated, 2000);
    }

    #[test]
    fn test_evidence_attaches_to_rated_competencies() {
        let db = seeded_db();
        {
            let conn = db.connection();
            for ts in [1500, 1800] {
                conn.execute(
                    "INSERT INTO competency_evidence (competencyid, userid, timemodified)
                     VALUES (1, 1, ?1)",
                    params![ts],
                )
                .unwrap();
            }
            // Evidence for a competency with no rating record
            conn.execute(
                "INSERT INTO competency (id, courseid, shortname, description)
                 VALUES (2, 10, 'unrated', NULL)",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO competency_evidence (competencyid, userid, timemodified)
                 VALUES (2, 1, 1600)",
                [],
            )
            .unwrap();
        }

        let mut engine = AggregationEngine::new();
        engine.register(Box::new(CompetencyAdapter));
        let records = engine.aggregate(&db, 10, &[1]).unwrap();

        let competency = &records[&1].competencies[&1];
        assert_eq!(competency.evidence_count, Some(2));
        assert_eq!(competency.last_evidence, Some(1800));
        // No rating record means no entry, evidence or not
        assert!(!records[&1].competencies.contains_key(&2));
    }

    #[test]
    fn test_skipped_entirely_without_plugin() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(10, "CS101", "Intro to CS").unwrap();

        let mut engine = AggregationEngine::new();
        engine.register(Box::new(CompetencyAdapter));
        let records = engine.aggregate(&db, 10, &[1]).unwrap();
        assert!(records[&1].competencies.is_empty());
    }
}
