//! Data-source adapters
//!
//! One module per metric domain. Every adapter scopes its queries to the
//! requested course and user set, rounds its aggregates before returning
//! them, and reports zero-denominator rates as 0.
//!
//! Use [`create_default_engine`] to get an engine with all built-in
//! adapters registered.

pub mod assignments;
pub mod attendance;
pub mod badges;
pub mod behavioral;
pub mod competencies;
pub mod forums;
pub mod interactive;
pub mod live_sessions;
pub mod ta_evaluation;

use super::engine::AggregationEngine;

/// Create an engine with all built-in adapters registered.
///
/// Adapter order matches the report layout; the adapters are independent,
/// so order only affects log output.
pub fn create_default_engine() -> AggregationEngine {
    create_engine_without(&[])
}

/// Create the default engine minus the named adapters
/// (`ReportConfig::disabled_adapters`).
pub fn create_engine_without(disabled: &[String]) -> AggregationEngine {
    let mut engine = AggregationEngine::new();
    let all: Vec<Box<dyn super::engine::DataSourceAdapter>> = vec![
        Box::new(assignments::AssignmentAdapter),
        Box::new(interactive::InteractiveContentAdapter),
        Box::new(live_sessions::LiveSessionAdapter),
        Box::new(forums::ForumAdapter),
        Box::new(attendance::AttendanceAdapter),
        Box::new(competencies::CompetencyAdapter),
        Box::new(badges::BadgeAdapter),
        Box::new(behavioral::BehavioralAdapter),
        Box::new(ta_evaluation::TaEvaluationAdapter),
    ];
    for adapter in all {
        if disabled.iter().any(|name| name == adapter.name()) {
            tracing::info!(adapter = adapter.name(), "Adapter disabled by config");
            continue;
        }
        engine.register(adapter);
    }
    engine
}

/// Round to 2 decimal places (the adapter-level default).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A count ratio as a percentage, rounded to 2 decimal places.
///
/// A zero (or negative) denominator yields 0, never a fault.
pub(crate) fn percent(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    clamp_pct(numerator as f64 / denominator as f64 * 100.0)
}

/// Clamp a percentage into [0,100] and round to 2 decimal places.
pub(crate) fn clamp_pct(value: f64) -> f64 {
    round2(value.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_has_adapters() {
        let engine = create_default_engine();
        let names = engine.adapter_names();

        assert_eq!(names.len(), 9);
        assert!(names.contains(&"core.assignments"));
        assert!(names.contains(&"core.ta_evaluation"));
    }

    #[test]
    fn test_disabled_adapters_excluded() {
        let engine = create_engine_without(&["core.behavioral".to_string()]);
        assert_eq!(engine.adapter_names().len(), 8);
        assert!(!engine.has_adapter("core.behavioral"));
    }

    #[test]
    fn test_percent_zero_denominator() {
        assert_eq!(percent(1, 0), 0.0);
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 2), 50.0);
        assert_eq!(percent(2, 3), 66.67);
    }

    #[test]
    fn test_clamp_pct_bounds() {
        assert_eq!(clamp_pct(150.0), 100.0);
        assert_eq!(clamp_pct(-3.0), 0.0);
        assert_eq!(clamp_pct(33.333), 33.33);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(70.005), 70.01);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }
}
