use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for combinator execution and compilation.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub operators: BTreeMap<String, OperatorCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EventOps {
    // Local evaluation
    pub iterators_opened: u64,
    pub materializations: u64,
    pub rows_materialized: u64,
    pub hash_probes: u64,
    pub rows_hashed: u64,

    // Compilation
    pub queries_compiled: u64,
    pub compositions_rendered: u64,
    pub folds: u64,
    pub fold_rejections: u64,
    pub params_bound: u64,

    // Remote execution
    pub remote_queries: u64,
    pub remote_rows: u64,
}

///
/// OperatorCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct OperatorCounters {
    pub iterators_opened: u64,
    pub rows_materialized: u64,
    pub rows_hashed: u64,
    pub folds: u64,
    pub fold_rejections: u64,
}

///
/// EventReport
/// Point-in-time copy of the metrics state.
///

pub type EventReport = EventState;

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

#[must_use]
pub fn report() -> EventReport {
    with_state(Clone::clone)
}
