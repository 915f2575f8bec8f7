//! Aggregation engine and data-source adapter framework
//!
//! Adapters read the host-platform snapshot and produce per-user partial
//! records for one metric domain. The engine owns the adapter registry,
//! probes optional-source availability once per invocation, and folds
//! every contribution into one [`AnalyticsRecord`] per requested user.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     AGGREGATION ENGINE                          │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐             │
//! │  │ Adapter A   │  │ Adapter B   │  │ Adapter C   │  ...        │
//! │  │ (assign)    │  │ (forums)    │  │ (badges)    │             │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘             │
//! │         │                │                │                     │
//! │         ▼                ▼                ▼                     │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              AggregationEngine.aggregate()              │   │
//! │  │  - Seeds one empty record per requested user            │   │
//! │  │  - Skips adapters whose source tables are missing       │   │
//! │  │  - Deep-merges each adapter's partial records           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The whole pass is a read-only snapshot computation: nothing is written,
//! cached, or invalidated, and concurrent callers simply re-run their own
//! queries.

use crate::db::{Database, OptionalSource};
use crate::error::{Error, Result};
use crate::types::{AnalyticsRecord, PartialRecord};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

/// Which optional plugin tables are present, probed once per invocation.
#[derive(Debug, Default)]
pub struct SourceAvailability {
    present: HashSet<&'static str>,
}

impl SourceAvailability {
    /// Probe every optional source table in one pass.
    pub fn probe(db: &Database) -> Result<Self> {
        let mut present = HashSet::new();
        for source in OptionalSource::ALL {
            for table in source.tables() {
                if db.table_exists(table)? {
                    present.insert(*table);
                }
            }
        }
        Ok(Self { present })
    }

    /// Whether a single optional table is available.
    pub fn has(&self, table: &str) -> bool {
        self.present.contains(table)
    }

    /// Whether every listed table is available.
    pub fn has_all(&self, tables: &[&str]) -> bool {
        tables.iter().all(|t| self.has(t))
    }
}

/// Context provided to adapters during collection.
///
/// Gives adapters read-only database access plus the availability map, so
/// partially-optional adapters never probe table existence inline.
pub struct CollectContext<'a> {
    pub db: &'a Database,
    pub sources: &'a SourceAvailability,
}

/// Trait that all data-source adapters must implement.
///
/// Adapters are stateless collectors. They must:
/// - scope every query to the requested course id and user-id set
/// - round numeric aggregates before returning them
/// - report zero-denominator rates as 0, never as an error
pub trait DataSourceAdapter: Send + Sync {
    /// Unique name for this adapter.
    ///
    /// Convention: `namespace.domain` (e.g. "core.assignments")
    fn name(&self) -> &'static str;

    /// Optional tables that must all exist for this adapter to run.
    ///
    /// An adapter reading only core tables returns an empty slice. An
    /// adapter with several independently-optional sources returns an
    /// empty slice too, and consults [`CollectContext::sources`] per
    /// source instead.
    fn required_tables(&self) -> &'static [&'static str] {
        &[]
    }

    /// Collect this domain's contribution for every requested user.
    ///
    /// Users with no activity in this domain may be absent from the
    /// returned map; the engine's seeded records cover them.
    fn collect(
        &self,
        course_id: i64,
        user_ids: &[i64],
        ctx: &CollectContext,
    ) -> Result<HashMap<i64, PartialRecord>>;
}

/// Engine that manages and runs data-source adapters.
pub struct AggregationEngine {
    adapters: Vec<Box<dyn DataSourceAdapter>>,
}

impl AggregationEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Register an adapter with the engine.
    pub fn register(&mut self, adapter: Box<dyn DataSourceAdapter>) {
        tracing::info!(adapter = adapter.name(), "Registered data-source adapter");
        self.adapters.push(adapter);
    }

    /// Get list of registered adapter names.
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Check if an adapter is registered.
    pub fn has_adapter(&self, name: &str) -> bool {
        self.adapters.iter().any(|a| a.name() == name)
    }

    /// Aggregate every registered adapter's metrics for the given users.
    ///
    /// Returns exactly one record per requested user id, however many
    /// adapters contributed nothing. An empty user-id set is rejected
    /// before any query runs.
    pub fn aggregate(
        &self,
        db: &Database,
        course_id: i64,
        user_ids: &[i64],
    ) -> Result<BTreeMap<i64, AnalyticsRecord>> {
        if user_ids.is_empty() {
            return Err(Error::EmptyUserSet);
        }

        let mut records: BTreeMap<i64, AnalyticsRecord> = user_ids
            .iter()
            .map(|uid| (*uid, AnalyticsRecord::default()))
            .collect();

        let sources = SourceAvailability::probe(db)?;
        let ctx = CollectContext { db, sources: &sources };

        for adapter in &self.adapters {
            if !sources.has_all(adapter.required_tables()) {
                tracing::debug!(
                    adapter = adapter.name(),
                    "Source tables missing, skipping adapter"
                );
                continue;
            }

            let start = Instant::now();
            let partials = adapter.collect(course_id, user_ids, &ctx)?;
            let contributed = partials.len();

            for (user_id, partial) in partials {
                // Adapters filter by the requested user set; anything else
                // would be a scoping bug, so it is dropped rather than
                // allowed to grow the result.
                match records.get_mut(&user_id) {
                    Some(record) => record.merge(partial),
                    None => tracing::warn!(
                        adapter = adapter.name(),
                        user_id,
                        "Adapter returned a user outside the requested set"
                    ),
                }
            }

            tracing::info!(
                adapter = adapter.name(),
                course_id,
                users = contributed,
                duration_ms = start.elapsed().as_millis() as i64,
                "Adapter completed"
            );
        }

        Ok(records)
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new()
    }
}
