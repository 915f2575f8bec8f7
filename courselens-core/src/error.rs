//! Error types for courselens-core

use thiserror::Error;

/// Main error type for the courselens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Course not found
    #[error("course not found: {0}")]
    CourseNotFound(i64),

    /// Requested user is not enrolled in the course
    #[error("user not enrolled: {0}")]
    UserNotEnrolled(i64),

    /// Acting user lacks the capability required for the report
    #[error("forbidden: user {user_id} lacks capability {capability}")]
    Forbidden { user_id: i64, capability: &'static str },

    /// Aggregation was requested for an empty user-id set
    #[error("empty user-id set")]
    EmptyUserSet,
}

/// Result type alias for courselens-core
pub type Result<T> = std::result::Result<T, Error>;
