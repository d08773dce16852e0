use crate::{
    config::EngineConfig,
    obs::sink::{MetricsEvent, record},
};

///
/// EvalContext
///
/// Per-call evaluation policy threaded through iterator construction and
/// compilation. Copied, never shared mutably.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EvalContext {
    debug: bool,
    materialize_warn_rows: Option<usize>,
    distinct_union_as_set: bool,
}

impl EvalContext {
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            debug: config.debug,
            materialize_warn_rows: config.materialize_warn_rows,
            distinct_union_as_set: config.distinct_union_as_set,
        }
    }

    #[must_use]
    pub const fn distinct_union_as_set(self) -> bool {
        self.distinct_union_as_set
    }

    pub(crate) fn debug_log(self, s: impl AsRef<str>) {
        if self.debug {
            println!("[debug] {}", s.as_ref());
        }
    }

    // Record one finished materialization and flag it when it crosses the threshold.
    pub(crate) fn note_materialized(self, op: &'static str, rows: usize) {
        record(MetricsEvent::Materialized {
            op,
            rows: u64::try_from(rows).unwrap_or(u64::MAX),
        });

        if self.materialize_warn_rows.is_some_and(|limit| rows > limit) {
            self.debug_log(format!("{op}: materialized {rows} ids in memory"));
        }
    }

    pub(crate) fn note_hash_probe(self, op: &'static str, rows: usize) {
        record(MetricsEvent::HashProbeBuilt {
            op,
            rows: u64::try_from(rows).unwrap_or(u64::MAX),
        });

        if self.materialize_warn_rows.is_some_and(|limit| rows > limit) {
            self.debug_log(format!("{op}: hashed {rows} ids for probing"));
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
