//! Analytics module for courselens
//!
//! The aggregation pipeline:
//! - Data-source adapters query the host-platform snapshot per domain
//! - The engine merges their partial records into one
//!   [`AnalyticsRecord`](crate::types::AnalyticsRecord) per user
//! - The export module flattens or nests the result for CSV/JSON/HTML
//!
//! See [`engine`] for the adapter framework and [`adapters`] for the
//! built-in domains.

pub mod adapters;
pub mod engine;

pub use adapters::{create_default_engine, create_engine_without};
pub use engine::{AggregationEngine, CollectContext, DataSourceAdapter, SourceAvailability};
