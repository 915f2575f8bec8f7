//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.
//!
//! The schema mirrors the slice of the host LMS that the report pipeline
//! reads: the core tables are always present, while per-plugin sources
//! (H5P, SCORM, live-session plugins, competencies, badges, certificates,
//! plagiarism scanning) exist only when the matching plugin is installed.
//! Those install through [`install_optional_source`], and the pipeline
//! treats their absence as zero contribution.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Core host-platform snapshot
    r#"
    -- ============================================
    -- Course, users, enrolment, roles
    -- ============================================

    CREATE TABLE IF NOT EXISTS course (
        id               INTEGER PRIMARY KEY,
        shortname        TEXT NOT NULL,
        fullname         TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users (
        id               INTEGER PRIMARY KEY,
        firstname        TEXT NOT NULL,
        lastname         TEXT NOT NULL,
        email            TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS enrolments (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        courseid         INTEGER NOT NULL REFERENCES course(id),
        userid           INTEGER NOT NULL REFERENCES users(id),

        UNIQUE(courseid, userid)
    );

    CREATE TABLE IF NOT EXISTS role (
        id               INTEGER PRIMARY KEY,
        shortname        TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS role_assignments (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        roleid           INTEGER NOT NULL REFERENCES role(id),
        userid           INTEGER NOT NULL REFERENCES users(id),
        courseid         INTEGER NOT NULL REFERENCES course(id)
    );

    -- ============================================
    -- Course modules and completion tracking
    -- ============================================

    CREATE TABLE IF NOT EXISTS modules (
        id               INTEGER PRIMARY KEY,
        name             TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS course_modules (
        id               INTEGER PRIMARY KEY,
        course           INTEGER NOT NULL REFERENCES course(id),
        module           INTEGER NOT NULL REFERENCES modules(id),
        instance         INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS course_modules_completion (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        coursemoduleid   INTEGER NOT NULL REFERENCES course_modules(id),
        userid           INTEGER NOT NULL REFERENCES users(id),
        completionstate  INTEGER NOT NULL,
        timemodified     INTEGER NOT NULL
    );

    -- ============================================
    -- Assignments and grading
    -- ============================================

    CREATE TABLE IF NOT EXISTS assign (
        id               INTEGER PRIMARY KEY,
        course           INTEGER NOT NULL REFERENCES course(id),
        name             TEXT NOT NULL,
        duedate          INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS assign_submission (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        assignment       INTEGER NOT NULL REFERENCES assign(id),
        userid           INTEGER NOT NULL REFERENCES users(id),
        status           TEXT NOT NULL,
        timemodified     INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS grade_items (
        id               INTEGER PRIMARY KEY,
        courseid         INTEGER NOT NULL REFERENCES course(id),
        itemtype         TEXT NOT NULL,
        itemmodule       TEXT,
        iteminstance     INTEGER
    );

    CREATE TABLE IF NOT EXISTS grade_grades (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        itemid           INTEGER NOT NULL REFERENCES grade_items(id),
        userid           INTEGER NOT NULL REFERENCES users(id),
        finalgrade       REAL,
        rawgrademax      REAL NOT NULL DEFAULT 100,
        feedback         TEXT
    );

    -- ============================================
    -- Forums
    -- ============================================

    CREATE TABLE IF NOT EXISTS forum (
        id               INTEGER PRIMARY KEY,
        course           INTEGER NOT NULL REFERENCES course(id),
        name             TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS forum_discussions (
        id               INTEGER PRIMARY KEY,
        forum            INTEGER NOT NULL REFERENCES forum(id),
        timemodified     INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS forum_posts (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        discussion       INTEGER NOT NULL REFERENCES forum_discussions(id),
        parent           INTEGER NOT NULL DEFAULT 0,
        userid           INTEGER NOT NULL REFERENCES users(id),
        created          INTEGER NOT NULL,
        rating           REAL
    );

    -- ============================================
    -- Activity log (video views, learning pace)
    -- ============================================

    CREATE TABLE IF NOT EXISTS logstore_standard_log (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        courseid          INTEGER NOT NULL,
        userid            INTEGER NOT NULL,
        contextinstanceid INTEGER,
        action            TEXT NOT NULL,
        timecreated       INTEGER NOT NULL
    );

    -- ============================================
    -- Per-plugin key/value config (job profiles)
    -- ============================================

    CREATE TABLE IF NOT EXISTS config_plugins (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        plugin           TEXT NOT NULL,
        name             TEXT NOT NULL,
        value            TEXT NOT NULL,

        UNIQUE(plugin, name)
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_enrolments_course ON enrolments(courseid);
    CREATE INDEX IF NOT EXISTS idx_role_assignments_course ON role_assignments(courseid, userid);
    CREATE INDEX IF NOT EXISTS idx_submission_assignment ON assign_submission(assignment, userid);
    CREATE INDEX IF NOT EXISTS idx_grades_item ON grade_grades(itemid, userid);
    CREATE INDEX IF NOT EXISTS idx_posts_discussion ON forum_posts(discussion);
    CREATE INDEX IF NOT EXISTS idx_completion_user ON course_modules_completion(userid);
    CREATE INDEX IF NOT EXISTS idx_log_course_user ON logstore_standard_log(courseid, userid);
    "#,
];

/// Optional per-plugin data sources.
///
/// Installing one creates its tables; an uninstalled source's adapter
/// contributes nothing to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalSource {
    H5p,
    Scorm,
    BigBlueButton,
    Zoom,
    Competency,
    Badges,
    Certificate,
    Plagiarism,
}

impl OptionalSource {
    /// All optional sources, in install order.
    pub const ALL: &'static [OptionalSource] = &[
        OptionalSource::H5p,
        OptionalSource::Scorm,
        OptionalSource::BigBlueButton,
        OptionalSource::Zoom,
        OptionalSource::Competency,
        OptionalSource::Badges,
        OptionalSource::Certificate,
        OptionalSource::Plagiarism,
    ];

    /// Tables this source owns.
    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            OptionalSource::H5p => &["hvp_content", "hvp_content_user_data"],
            OptionalSource::Scorm => &["scorm", "scorm_scoes_track"],
            OptionalSource::BigBlueButton => &["bigbluebuttonbn", "bigbluebuttonbn_logs"],
            OptionalSource::Zoom => &["zoom", "zoom_meeting_participants"],
            OptionalSource::Competency => {
                &["competency", "competency_usercomp", "competency_evidence"]
            }
            OptionalSource::Badges => &["badge", "badge_issued"],
            OptionalSource::Certificate => &["certificate", "certificate_issues"],
            OptionalSource::Plagiarism => &["plagiarism_plagscan_doc"],
        }
    }

    fn ddl(&self) -> &'static str {
        match self {
            OptionalSource::H5p => {
                r#"
                CREATE TABLE IF NOT EXISTS hvp_content (
                    id         INTEGER PRIMARY KEY,
                    course     INTEGER NOT NULL,
                    title      TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS hvp_content_user_data (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    content_id INTEGER NOT NULL REFERENCES hvp_content(id),
                    user_id    INTEGER NOT NULL,
                    data       REAL,
                    timestamp  INTEGER NOT NULL
                );
                "#
            }
            OptionalSource::Scorm => {
                r#"
                CREATE TABLE IF NOT EXISTS scorm (
                    id           INTEGER PRIMARY KEY,
                    course       INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS scorm_scoes_track (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    scormid      INTEGER NOT NULL REFERENCES scorm(id),
                    scoid        INTEGER NOT NULL,
                    userid       INTEGER NOT NULL,
                    element      TEXT NOT NULL,
                    value        REAL,
                    timemodified INTEGER NOT NULL
                );
                "#
            }
            OptionalSource::BigBlueButton => {
                r#"
                CREATE TABLE IF NOT EXISTS bigbluebuttonbn (
                    id                INTEGER PRIMARY KEY,
                    course            INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS bigbluebuttonbn_logs (
                    id                INTEGER PRIMARY KEY AUTOINCREMENT,
                    bigbluebuttonbnid INTEGER NOT NULL REFERENCES bigbluebuttonbn(id),
                    userid            INTEGER NOT NULL,
                    meetingid         TEXT,
                    event             TEXT NOT NULL,
                    duration          INTEGER NOT NULL DEFAULT 0
                );
                "#
            }
            OptionalSource::Zoom => {
                r#"
                CREATE TABLE IF NOT EXISTS zoom (
                    id         INTEGER PRIMARY KEY,
                    course     INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS zoom_meeting_participants (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    meetingid  INTEGER NOT NULL REFERENCES zoom(id),
                    userid     INTEGER NOT NULL,
                    duration   INTEGER NOT NULL DEFAULT 0,
                    join_time  INTEGER NOT NULL,
                    start_time INTEGER NOT NULL
                );
                "#
            }
            OptionalSource::Competency => {
                r#"
                CREATE TABLE IF NOT EXISTS competency (
                    id           INTEGER PRIMARY KEY,
                    courseid     INTEGER NOT NULL,
                    shortname    TEXT NOT NULL,
                    description  TEXT
                );
                CREATE TABLE IF NOT EXISTS competency_usercomp (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    competencyid INTEGER NOT NULL REFERENCES competency(id),
                    userid       INTEGER NOT NULL,
                    grade        REAL,
                    proficiency  INTEGER NOT NULL DEFAULT 0,
                    status       INTEGER NOT NULL DEFAULT 0,
                    timecreated  INTEGER NOT NULL,
                    timemodified INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS competency_evidence (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    competencyid INTEGER NOT NULL REFERENCES competency(id),
                    userid       INTEGER NOT NULL,
                    timemodified INTEGER NOT NULL
                );
                "#
            }
            OptionalSource::Badges => {
                r#"
                CREATE TABLE IF NOT EXISTS badge (
                    id          INTEGER PRIMARY KEY,
                    courseid    INTEGER NOT NULL,
                    name        TEXT NOT NULL,
                    description TEXT
                );
                CREATE TABLE IF NOT EXISTS badge_issued (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    badgeid     INTEGER NOT NULL REFERENCES badge(id),
                    userid      INTEGER NOT NULL,
                    dateissued  INTEGER NOT NULL,
                    uniquehash  TEXT NOT NULL
                );
                "#
            }
            OptionalSource::Certificate => {
                r#"
                CREATE TABLE IF NOT EXISTS certificate (
                    id            INTEGER PRIMARY KEY,
                    course        INTEGER NOT NULL,
                    name          TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS certificate_issues (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    certificateid INTEGER NOT NULL REFERENCES certificate(id),
                    userid        INTEGER NOT NULL,
                    timecreated   INTEGER NOT NULL,
                    code          TEXT NOT NULL
                );
                "#
            }
            OptionalSource::Plagiarism => {
                r#"
                CREATE TABLE IF NOT EXISTS plagiarism_plagscan_doc (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    cm              INTEGER NOT NULL,
                    userid          INTEGER NOT NULL,
                    similarityscore REAL NOT NULL
                );
                "#
            }
        }
    }
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Install one optional plugin source's tables.
pub fn install_optional_source(
    conn: &Connection,
    source: OptionalSource,
) -> crate::error::Result<()> {
    tracing::info!(?source, "Installing optional source");
    conn.execute_batch(source.ddl())?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run migrations twice - should be idempotent
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_core_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = [
            "course",
            "users",
            "enrolments",
            "role",
            "role_assignments",
            "modules",
            "course_modules",
            "course_modules_completion",
            "assign",
            "assign_submission",
            "grade_items",
            "grade_grades",
            "forum",
            "forum_discussions",
            "forum_posts",
            "logstore_standard_log",
            "config_plugins",
        ];

        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_optional_sources_absent_until_installed() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='badge_issued'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(exists, 0, "optional tables must not ship with core schema");

        install_optional_source(&conn, OptionalSource::Badges).unwrap();

        let exists: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='badge_issued'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1);
    }

    #[test]
    fn test_install_all_optional_sources() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for source in OptionalSource::ALL {
            install_optional_source(&conn, *source).unwrap();
            for table in source.tables() {
                let exists: i32 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                        [table],
                        |r| r.get(0),
                    )
                    .unwrap();
                assert_eq!(exists, 1, "Table {} should exist", table);
            }
        }
    }
}
