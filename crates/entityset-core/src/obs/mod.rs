//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Nothing here influences evaluation; sinks only observe.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, OperatorCounters};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all};
