//! Metrics sink boundary.
//!
//! Combinator and compiler code never touches `obs::metrics` directly.
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.
use crate::obs::metrics;
use std::cell::Cell;

thread_local! {
    static SINK_OVERRIDE: Cell<Option<&'static dyn MetricsSink>> = const { Cell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    /// A local iterator was built for one combinator node.
    IteratorOpened { op: &'static str },
    /// An unsorted child was drained and sorted before merging.
    Materialized { op: &'static str, rows: u64 },
    /// A hash-probe set was built from one side of a binary operator.
    HashProbeBuilt { op: &'static str, rows: u64 },
    /// A node tree was compiled to query text.
    QueryCompiled { compositions: u64, params: u64 },
    /// Two selects were folded into one flat select.
    SelectFolded { op: &'static str },
    /// A binary select could not be folded into a flat predicate.
    FoldRejected { op: &'static str },
    /// A compiled query was executed against a remote backend.
    RemoteExecuted { rows: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

///
/// GlobalMetricsSink
/// Default sink that writes into thread-local metrics state.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::IteratorOpened { op } => {
                m.ops.iterators_opened = m.ops.iterators_opened.saturating_add(1);
                let entry = m.operators.entry(op.to_string()).or_default();
                entry.iterators_opened = entry.iterators_opened.saturating_add(1);
            }
            MetricsEvent::Materialized { op, rows } => {
                m.ops.materializations = m.ops.materializations.saturating_add(1);
                m.ops.rows_materialized = m.ops.rows_materialized.saturating_add(rows);
                let entry = m.operators.entry(op.to_string()).or_default();
                entry.rows_materialized = entry.rows_materialized.saturating_add(rows);
            }
            MetricsEvent::HashProbeBuilt { op, rows } => {
                m.ops.hash_probes = m.ops.hash_probes.saturating_add(1);
                m.ops.rows_hashed = m.ops.rows_hashed.saturating_add(rows);
                let entry = m.operators.entry(op.to_string()).or_default();
                entry.rows_hashed = entry.rows_hashed.saturating_add(rows);
            }
            MetricsEvent::QueryCompiled {
                compositions,
                params,
            } => {
                m.ops.queries_compiled = m.ops.queries_compiled.saturating_add(1);
                m.ops.compositions_rendered =
                    m.ops.compositions_rendered.saturating_add(compositions);
                m.ops.params_bound = m.ops.params_bound.saturating_add(params);
            }
            MetricsEvent::SelectFolded { op } => {
                m.ops.folds = m.ops.folds.saturating_add(1);
                let entry = m.operators.entry(op.to_string()).or_default();
                entry.folds = entry.folds.saturating_add(1);
            }
            MetricsEvent::FoldRejected { op } => {
                m.ops.fold_rejections = m.ops.fold_rejections.saturating_add(1);
                let entry = m.operators.entry(op.to_string()).or_default();
                entry.fold_rejections = entry.fold_rejections.saturating_add(1);
            }
            MetricsEvent::RemoteExecuted { rows } => {
                m.ops.remote_queries = m.ops.remote_queries.saturating_add(1);
                m.ops.remote_rows = m.ops.remote_rows.saturating_add(rows);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    match SINK_OVERRIDE.with(Cell::get) {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub(crate) fn with_metrics_sink<T>(sink: &'static dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<&'static dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| cell.set(self.0));
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.replace(Some(sink)));
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CapturingSink {
        events: Mutex<Vec<MetricsEvent>>,
    }

    impl MetricsSink for CapturingSink {
        fn record(&self, event: MetricsEvent) {
            self.events
                .lock()
                .expect("capture lock should not be poisoned")
                .push(event);
        }
    }

    static CAPTURE: CapturingSink = CapturingSink {
        events: Mutex::new(Vec::new()),
    };

    #[test]
    fn scoped_override_captures_and_restores() {
        metrics_reset_all();

        with_metrics_sink(&CAPTURE, || {
            record(MetricsEvent::FoldRejected { op: "intersect" });
        });
        record(MetricsEvent::FoldRejected { op: "union" });

        let captured = CAPTURE
            .events
            .lock()
            .expect("capture lock should not be poisoned")
            .clone();
        assert_eq!(captured, vec![MetricsEvent::FoldRejected { op: "intersect" }]);

        let report = metrics_report();
        assert_eq!(report.ops.fold_rejections, 1, "global sink must see only the un-scoped event");
        assert!(report.operators.contains_key("union"));
        assert!(!report.operators.contains_key("intersect"));
    }

    #[test]
    fn global_sink_accumulates_per_operator_rows() {
        metrics_reset_all();

        record(MetricsEvent::Materialized { op: "union", rows: 3 });
        record(MetricsEvent::Materialized { op: "union", rows: 4 });
        record(MetricsEvent::HashProbeBuilt { op: "minus", rows: 2 });

        let report = metrics_report();
        assert_eq!(report.ops.materializations, 2);
        assert_eq!(report.ops.rows_materialized, 7);
        assert_eq!(report.ops.rows_hashed, 2);
        assert_eq!(report.operators["union"].rows_materialized, 7);
        assert_eq!(report.operators["minus"].rows_hashed, 2);
    }
}
