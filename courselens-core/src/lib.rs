//! # courselens-core
//!
//! Core library for courselens - course analytics reporting over a
//! learning-management snapshot.
//!
//! This library provides:
//! - Domain types for the unified per-user analytics record
//! - Database storage layer with SQLite
//! - Data-source adapters and the aggregation engine
//! - Export formatting (CSV rows, JSON summary, HTML dashboard)
//! - The weighted-skill job-profile calculator
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Snapshot:** the host platform's relational tables in SQLite
//! - **Aggregation:** per-domain adapters merged into one
//!   [`AnalyticsRecord`] per user, computed fresh on every request
//! - **Export:** flat CSV rows, a nested JSON summary, or the dashboard
//!
//! ## Example
//!
//! ```rust,no_run
//! use courselens_core::{analytics::create_default_engine, report, Config, Database};
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let engine = create_default_engine();
//! let result = report::get_comprehensive_analytics(&db, &engine, 10, 0)
//!     .expect("failed to aggregate");
//! println!("{} users", result.users.len());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::{Database, OptionalSource};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod jobprofile;
pub mod logging;
pub mod report;
pub mod types;
