//! Database repository layer
//!
//! Provides the connection handle plus the non-adapter queries: course and
//! enrolment lookups, the capability check, plugin config, and the insert
//! helpers used to load a host-platform snapshot (and to seed tests).
//! Adapter aggregation queries live with their adapters.

use crate::error::{Error, Result};
use crate::types::{Course, UserRow};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

use super::schema::OptionalSource;

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Install an optional plugin source's tables.
    pub fn install_optional_source(&self, source: OptionalSource) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::install_optional_source(&conn, source)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Whether a table exists in the schema.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            [name],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    // ============================================
    // Course and enrolment
    // ============================================

    /// Get a course by id.
    pub fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, shortname, fullname FROM course WHERE id = ?",
            [id],
            Self::row_to_course,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Get a course by id, failing with `CourseNotFound` when absent.
    pub fn require_course(&self, id: i64) -> Result<Course> {
        self.get_course(id)?.ok_or(Error::CourseNotFound(id))
    }

    fn row_to_course(row: &Row) -> rusqlite::Result<Course> {
        Ok(Course {
            id: row.get("id")?,
            shortname: row.get("shortname")?,
            fullname: row.get("fullname")?,
        })
    }

    /// Enrolled users for a course, ordered by lastname then firstname.
    pub fn get_enrolled_users(&self, course_id: i64) -> Result<Vec<UserRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT u.id, u.firstname, u.lastname, u.email
            FROM users u
            JOIN enrolments e ON e.userid = u.id
            WHERE e.courseid = ?
            ORDER BY u.lastname, u.firstname
            "#,
        )?;
        let users = stmt
            .query_map([course_id], |row| {
                Ok(UserRow {
                    id: row.get("id")?,
                    firstname: row.get("firstname")?,
                    lastname: row.get("lastname")?,
                    email: row.get("email")?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Whether the user holds an instructor-class role in the course.
    pub fn has_instructor_role(&self, course_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM role_assignments ra
            JOIN role r ON ra.roleid = r.id
            WHERE ra.courseid = ?1 AND ra.userid = ?2
              AND r.shortname IN ('teacher', 'editingteacher', 'manager')
            "#,
            params![course_id, user_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    // ============================================
    // Plugin config (job profiles)
    // ============================================

    /// Read one plugin config value.
    pub fn get_plugin_config(&self, plugin: &str, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM config_plugins WHERE plugin = ?1 AND name = ?2",
            params![plugin, name],
            |r| r.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    /// Write one plugin config value, replacing any previous value.
    pub fn set_plugin_config(&self, plugin: &str, name: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO config_plugins (plugin, name, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(plugin, name) DO UPDATE SET value = excluded.value
            "#,
            params![plugin, name, value],
        )?;
        Ok(())
    }

    // ============================================
    // Snapshot loading (core tables)
    // ============================================

    pub fn insert_course(&self, id: i64, shortname: &str, fullname: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO course (id, shortname, fullname) VALUES (?1, ?2, ?3)",
            params![id, shortname, fullname],
        )?;
        Ok(())
    }

    pub fn insert_user(
        &self,
        id: i64,
        firstname: &str,
        lastname: &str,
        email: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (id, firstname, lastname, email) VALUES (?1, ?2, ?3, ?4)",
            params![id, firstname, lastname, email],
        )?;
        Ok(())
    }

    pub fn enrol_user(&self, course_id: i64, user_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO enrolments (courseid, userid) VALUES (?1, ?2)",
            params![course_id, user_id],
        )?;
        Ok(())
    }

    pub fn insert_role(&self, id: i64, shortname: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO role (id, shortname) VALUES (?1, ?2)",
            params![id, shortname],
        )?;
        Ok(())
    }

    pub fn assign_role(&self, role_id: i64, user_id: i64, course_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO role_assignments (roleid, userid, courseid) VALUES (?1, ?2, ?3)",
            params![role_id, user_id, course_id],
        )?;
        Ok(())
    }

    pub fn insert_module(&self, id: i64, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO modules (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(())
    }

    pub fn insert_course_module(
        &self,
        id: i64,
        course_id: i64,
        module_id: i64,
        instance: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO course_modules (id, course, module, instance) VALUES (?1, ?2, ?3, ?4)",
            params![id, course_id, module_id, instance],
        )?;
        Ok(())
    }

    pub fn insert_completion(
        &self,
        course_module_id: i64,
        user_id: i64,
        completion_state: i64,
        time_modified: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO course_modules_completion
                (coursemoduleid, userid, completionstate, timemodified)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![course_module_id, user_id, completion_state, time_modified],
        )?;
        Ok(())
    }

    pub fn insert_assignment(
        &self,
        id: i64,
        course_id: i64,
        name: &str,
        due_date: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO assign (id, course, name, duedate) VALUES (?1, ?2, ?3, ?4)",
            params![id, course_id, name, due_date],
        )?;
        Ok(())
    }

    pub fn insert_submission(
        &self,
        assignment_id: i64,
        user_id: i64,
        status: &str,
        time_modified: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO assign_submission (assignment, userid, status, timemodified)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![assignment_id, user_id, status, time_modified],
        )?;
        Ok(())
    }

    pub fn insert_grade_item(
        &self,
        id: i64,
        course_id: i64,
        item_type: &str,
        item_module: Option<&str>,
        item_instance: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO grade_items (id, courseid, itemtype, itemmodule, iteminstance)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, course_id, item_type, item_module, item_instance],
        )?;
        Ok(())
    }

    pub fn insert_grade(
        &self,
        item_id: i64,
        user_id: i64,
        final_grade: Option<f64>,
        raw_grade_max: f64,
        feedback: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO grade_grades (itemid, userid, finalgrade, rawgrademax, feedback)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![item_id, user_id, final_grade, raw_grade_max, feedback],
        )?;
        Ok(())
    }

    pub fn insert_forum(&self, id: i64, course_id: i64, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO forum (id, course, name) VALUES (?1, ?2, ?3)",
            params![id, course_id, name],
        )?;
        Ok(())
    }

    pub fn insert_discussion(&self, id: i64, forum_id: i64, time_modified: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO forum_discussions (id, forum, timemodified) VALUES (?1, ?2, ?3)",
            params![id, forum_id, time_modified],
        )?;
        Ok(())
    }

    pub fn insert_post(
        &self,
        discussion_id: i64,
        parent: i64,
        user_id: i64,
        created: i64,
        rating: Option<f64>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO forum_posts (discussion, parent, userid, created, rating)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![discussion_id, parent, user_id, created, rating],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_log_entry(
        &self,
        course_id: i64,
        user_id: i64,
        context_instance_id: Option<i64>,
        action: &str,
        time_created: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO logstore_standard_log
                (courseid, userid, contextinstanceid, action, timecreated)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![course_id, user_id, context_instance_id, action, time_created],
        )?;
        Ok(())
    }
}
