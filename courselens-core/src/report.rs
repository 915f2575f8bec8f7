//! Report service
//!
//! The read API over the aggregation pipeline. Validates the course, the
//! capability of the acting user, and the requested user's enrolment
//! before any aggregation query runs; every fault is terminal for the
//! request.

use crate::analytics::AggregationEngine;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{Course, UserAnalytics, UserRow};

/// Capability name required to view the report.
pub const VIEW_CAPABILITY: &str = "report/analytics:view";

/// Check that the acting user may view analytics for the course.
///
/// The acting user arrives as an explicit request value; the core holds
/// no ambient session state.
pub fn require_view_capability(db: &Database, course_id: i64, acting_user: i64) -> Result<()> {
    if db.has_instructor_role(course_id, acting_user)? {
        Ok(())
    } else {
        Err(Error::Forbidden {
            user_id: acting_user,
            capability: VIEW_CAPABILITY,
        })
    }
}

/// Resolve the user set for a report request.
///
/// `user_id == 0` selects every enrolled user; a positive id must belong
/// to the enrolment set, else the request is rejected with
/// "user not enrolled".
pub fn resolve_users(db: &Database, course_id: i64, user_id: i64) -> Result<Vec<UserRow>> {
    let users = db.get_enrolled_users(course_id)?;
    if user_id <= 0 {
        return Ok(users);
    }
    match users.into_iter().find(|u| u.id == user_id) {
        Some(user) => Ok(vec![user]),
        None => Err(Error::UserNotEnrolled(user_id)),
    }
}

/// Full report payload: the course plus per-user analytics, ordered by
/// (lastname, firstname).
#[derive(Debug)]
pub struct Report {
    pub course: Course,
    pub users: Vec<UserAnalytics>,
}

/// Compute comprehensive analytics for a course.
///
/// An empty enrolment set yields an empty result, not a fault. Everything
/// else about the computation is a fresh, read-only aggregation pass.
pub fn get_comprehensive_analytics(
    db: &Database,
    engine: &AggregationEngine,
    course_id: i64,
    user_id: i64,
) -> Result<Report> {
    let course = db.require_course(course_id)?;
    let users = resolve_users(db, course_id, user_id)?;

    if users.is_empty() {
        return Ok(Report {
            course,
            users: vec![],
        });
    }

    let user_ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    let mut records = engine.aggregate(db, course_id, &user_ids)?;

    let users = users
        .into_iter()
        .map(|user| {
            let analytics = records.remove(&user.id).unwrap_or_default();
            UserAnalytics {
                userid: user.id,
                firstname: user.firstname,
                lastname: user.lastname,
                email: user.email,
                analytics,
            }
        })
        .collect();

    Ok(Report { course, users })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::create_default_engine;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(10, "CS101", "Intro to CS").unwrap();
        db.insert_user(1, "Ben", "Alpha", "ben@example.org").unwrap();
        db.insert_user(2, "Ada", "Beta", "ada@example.org").unwrap();
        db.insert_user(3, "Cal", "Gamma", "cal@example.org").unwrap();
        db.enrol_user(10, 1).unwrap();
        db.enrol_user(10, 2).unwrap();
        db.insert_role(1, "editingteacher").unwrap();
        db.assign_role(1, 3, 10).unwrap();
        db
    }

    #[test]
    fn test_course_not_found_before_any_query() {
        let db = seeded_db();
        let engine = create_default_engine();
        assert!(matches!(
            get_comprehensive_analytics(&db, &engine, 99, 0),
            Err(Error::CourseNotFound(99))
        ));
    }

    #[test]
    fn test_all_users_one_record_each() {
        let db = seeded_db();
        let engine = create_default_engine();
        let report = get_comprehensive_analytics(&db, &engine, 10, 0).unwrap();

        assert_eq!(report.course.shortname, "CS101");
        assert_eq!(report.users.len(), 2);
        // Ordered by lastname
        assert_eq!(report.users[0].lastname, "Alpha");
        assert_eq!(report.users[1].lastname, "Beta");
    }

    #[test]
    fn test_single_user_must_be_enrolled() {
        let db = seeded_db();
        let engine = create_default_engine();

        let report = get_comprehensive_analytics(&db, &engine, 10, 2).unwrap();
        assert_eq!(report.users.len(), 1);
        assert_eq!(report.users[0].userid, 2);

        // User 3 exists but is not enrolled
        assert!(matches!(
            get_comprehensive_analytics(&db, &engine, 10, 3),
            Err(Error::UserNotEnrolled(3))
        ));
    }

    #[test]
    fn test_empty_enrolment_is_empty_result() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.insert_course(20, "EMPTY", "Empty Course").unwrap();

        let engine = create_default_engine();
        let report = get_comprehensive_analytics(&db, &engine, 20, 0).unwrap();
        assert!(report.users.is_empty());
    }

    #[test]
    fn test_capability_check() {
        let db = seeded_db();
        assert!(require_view_capability(&db, 10, 3).is_ok());
        assert!(matches!(
            require_view_capability(&db, 10, 1),
            Err(Error::Forbidden { user_id: 1, .. })
        ));
    }
}
