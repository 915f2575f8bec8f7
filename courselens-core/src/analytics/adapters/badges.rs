//! Badges and certificates adapter
//!
//! Both award sources are optional plugins; either contributes
//! independently of the other.

use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{BadgeAward, CertificateAward, PartialRecord};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct BadgeAdapter;

impl DataSourceAdapter for BadgeAdapter {
    fn name(&self) -> &'static str {
        "core.badges"
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

        // Badges earned
        if ctx.sources.has("badge_issued") {
            let sql = format!(
                r#"
                SELECT bi.userid, b.id AS badgeid, b.name, b.description,
                       bi.dateissued, bi.uniquehash
                FROM badge_issued bi
                JOIN badge b ON bi.badgeid = b.id
                WHERE b.courseid = ? AND bi.userid IN ({marks})
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, i64>("badgeid")?,
                            row.get::<_, String>("name")?,
                            row.get::<_, Option<String>>("description")?,
                            row.get::<_, i64>("dateissued")?,
                            row.get::<_, String>("uniquehash")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, badge_id, name, description, issued, hash) in rows {
                partials.entry(user_id).or_default().badges.insert(
                    badge_id,
                    BadgeAward {
                        name,
                        description: description.unwrap_or_default(),
                        date_earned: issued,
                        unique_hash: hash,
                    },
                );
            }
        }

        // Certificates
        if ctx.sources.has("certificate_issues") {
            let sql = format!(
                r#"
                SELECT ci.userid, c.id AS certificateid, c.name,
                       ci.timecreated, ci.code
                FROM certificate_issues ci
                JOIN certificate c ON ci.certificateid = c.id
                WHERE c.course = ? AND ci.userid IN ({marks})
                "#
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                    |row| {
                        Ok((
                            row.get::<_, i64>("userid")?,
                            row.get::<_, i64>("certificateid")?,
                            row.get::<_, String>("name")?,
                            row.get::<_, i64>("timecreated")?,
                            row.get::<_, String>("code")?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (user_id, certificate_id, name, created, code) in rows {
                partials.entry(user_id).or_default().certificates.insert(
                    certificate_id,
                    CertificateAward {
                        name,
                        date_achieved: created,
                        code,
                    },
                );
            }
        }

        Ok(partials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::engine::SourceAvailability;
    use crate::db::{Database, OptionalSource};

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(10, "CS101", "Intro to CS").unwrap();
        db.insert_user(1, "Bea", "Badged", "bea@example.org").unwrap();
        db.enrol_user(10, 1).unwrap();
        db
    }

    fn collect(db: &Database, user_ids: &[i64]) -> HashMap<i64, PartialRecord> {
        let sources = SourceAvailability::probe(db).unwrap();
        let ctx = CollectContext { db, sources: &sources };
        BadgeAdapter.collect(10, user_ids, &ctx).unwrap()
    }

    #[test]
    fn test_no_award_plugins_no_contribution() {
        let db = seeded_db();
        assert!(collect(&db, &[1]).is_empty());
    }

    #[test]
    fn test_badges_earned() {
        let db = seeded_db();
        db.install_optional_source(OptionalSource::Badges).unwrap();
        {
            let conn = db.connection();
            conn.execute(
                "INSERT INTO badge (id, courseid, name, description)
                 VALUES (4, 10, 'Fast Finisher', 'Completed early')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO badge_issued (badgeid, userid, dateissued, uniquehash)
                 VALUES (4, 1, 5000, 'abc123')",
                [],
            )
            .unwrap();
        }

        let partials = collect(&db, &[1]);
        let badge = &partials[&1].badges[&4];
        assert_eq!(badge.name, "Fast Finisher");
        assert_eq!(badge.date_earned, 5000);
        assert_eq!(badge.unique_hash, "abc123");
        assert!(partials[&1].certificates.is_empty());
    }

    #[test]
    fn test_certificates_independent_of_badges() {
        let db = seeded_db();
        db.install_optional_source(OptionalSource::Certificate).unwrap();
        {
            let conn = db.connection();
            conn.execute(
                "INSERT INTO certificate (id, course, name) VALUES (9, 10, 'Completion')",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO certificate_issues (certificateid, userid, timecreated, code)
                 VALUES (9, 1, 6000, 'CERT-9')",
                [],
            )
            .unwrap();
        }

        let partials = collect(&db, &[1]);
        assert!(partials[&1].badges.is_empty());
        let certificate = &partials[&1].certificates[&9];
        assert_eq!(certificate.name, "Completion");
        assert_eq!(certificate.code, "CERT-9");
    }
}
