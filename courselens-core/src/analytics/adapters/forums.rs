//! Forum and collaboration adapter
//!
//! Per-forum posting activity, response latency against the discussion's
//! last-modified time, peer ratings, and the number of replies the user's
//! posts received from instructor-role authors. The instructor-reply pass
//! merges only onto forums the user already has activity in.

use super::round2;
use crate::analytics::engine::{CollectContext, DataSourceAdapter};
use crate::db::in_placeholders;
use crate::error::Result;
use crate::types::{ForumMetrics, PartialRecord};
use rusqlite::params_from_iter;
use std::collections::HashMap;

pub struct ForumAdapter;

impl DataSourceAdapter for ForumAdapter {
    fn name(&self) -> &'static str {
        "core.forums"
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

        // Forum posts and replies
        let sql = format!(
            r#"
            SELECT fp.userid, f.id AS forumid, f.name AS forumname,
                   COUNT(CASE WHEN fp.parent = 0 THEN fp.id END) AS posts_created,
                   COUNT(CASE WHEN fp.parent > 0 THEN fp.id END) AS replies_made,
                   AVG((fp.created - fd.timemodified) / 60.0) AS avg_response_latency,
                   COUNT(CASE WHEN fp.rating > 0 THEN fp.id END) AS posts_with_ratings,
                   AVG(fp.rating) AS avg_peer_rating
            FROM forum_posts fp
            JOIN forum_discussions fd ON fp.discussion = fd.id
            JOIN forum f ON fd.forum = f.id
            WHERE f.course = ? AND fp.userid IN ({marks})
            GROUP BY fp.userid, f.id, f.name
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("forumid")?,
                        row.get::<_, String>("forumname")?,
                        row.get::<_, i64>("posts_created")?,
                        row.get::<_, i64>("replies_made")?,
                        row.get::<_, Option<f64>>("avg_response_latency")?,
                        row.get::<_, i64>("posts_with_ratings")?,
                        row.get::<_, Option<f64>>("avg_peer_rating")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, forum_id, name, posts, replies, latency, rated, rating) in rows {
            partials.entry(user_id).or_default().forums.insert(
                forum_id,
                ForumMetrics {
                    name,
                    posts_created: posts,
                    replies_made: replies,
                    avg_response_latency: round2(latency.unwrap_or(0.0)),
                    posts_with_ratings: rated,
                    avg_peer_rating: round2(rating.unwrap_or(0.0)),
                    instructor_replies: None,
                },
            );
        }

        // Replies the user's posts received from instructor-role authors
        let sql = format!(
            r#"
            SELECT parent_post.userid AS userid, f.id AS forumid,
                   COUNT(reply.id) AS instructor_replies
            FROM forum_posts reply
            JOIN forum_posts parent_post ON reply.parent = parent_post.id
            JOIN forum_discussions fd ON parent_post.discussion = fd.id
            JOIN forum f ON fd.forum = f.id
            WHERE f.course = ? AND parent_post.userid IN ({marks})
              AND reply.userid IN (
                  SELECT DISTINCT ra.userid FROM role_assignments ra
                  JOIN role r ON ra.roleid = r.id
                  WHERE r.shortname IN ('teacher', 'editingteacher', 'manager')
              )
            GROUP BY parent_post.userid, f.id
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params_from_iter([course_id].into_iter().chain(user_ids.iter().copied())),
                |row| {
                    Ok((
                        row.get::<_, i64>("userid")?,
                        row.get::<_, i64>("forumid")?,
                        row.get::<_, i64>("instructor_replies")?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (user_id, forum_id, replies) in rows {
            partials
                .entry(user_id)
                .or_default()
                .instructor_replies
                .insert(forum_id, replies);
        }

        Ok(partials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::engine::{AggregationEngine, SourceAvailability};
    use crate::db::Database;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(10, "CS101", "Intro to CS").unwrap();
        db.insert_user(1, "Pat", "Poster", "pat@example.org").unwrap();
        db.insert_user(2, "Tia", "Teacher", "tia@example.org").unwrap();
        db.enrol_user(10, 1).unwrap();
        db.insert_role(1, "editingteacher").unwrap();
        db.assign_role(1, 2, 10).unwrap();

        db.insert_forum(50, 10, "General").unwrap();
        db.insert_discussion(500, 50, 1000).unwrap();
        db
    }

    fn collect(db: &Database, user_ids: &[i64]) -> HashMap<i64, PartialRecord> {
        let sources = SourceAvailability::probe(db).unwrap();
        let ctx = CollectContext { db, sources: &sources };
        ForumAdapter.collect(10, user_ids, &ctx).unwrap()
    }

    #[test]
    fn test_posts_replies_and_latency() {
        let db = seeded_db();
        // A top-level post 30 minutes after the discussion update,
        // and a reply 90 minutes after
        let top = db.insert_post(500, 0, 1, 1000 + 30 * 60, Some(4.0)).unwrap();
        db.insert_post(500, top, 1, 1000 + 90 * 60, None).unwrap();

        let partials = collect(&db, &[1]);
        let forum = &partials[&1].forums[&50];
        assert_eq!(forum.name, "General");
        assert_eq!(forum.posts_created, 1);
        assert_eq!(forum.replies_made, 1);
        assert!((forum.avg_response_latency - 60.0).abs() < 0.001);
        assert_eq!(forum.posts_with_ratings, 1);
        assert!((forum.avg_peer_rating - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_instructor_replies_require_existing_forum_entry() {
        let db = seeded_db();
        let top = db.insert_post(500, 0, 1, 2000, None).unwrap();
        // Instructor replies twice, another student once
        db.insert_post(500, top, 2, 2100, None).unwrap();
        db.insert_post(500, top, 2, 2200, None).unwrap();
        db.insert_user(3, "Sol", "Student", "sol@example.org").unwrap();
        db.insert_post(500, top, 3, 2300, None).unwrap();

        let mut engine = AggregationEngine::new();
        engine.register(Box::new(ForumAdapter));
        let records = engine.aggregate(&db, 10, &[1]).unwrap();

        let forum = &records[&1].forums[&50];
        assert_eq!(forum.instructor_replies, Some(2));
    }

    #[test]
    fn test_user_with_no_posts_contributes_nothing() {
        let db = seeded_db();
        let partials = collect(&db, &[1]);
        assert!(partials.is_empty());
    }
}
