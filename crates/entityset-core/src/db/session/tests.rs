use crate::{
    config::EngineConfig,
    db::{
        DbSession,
        executor::{EvalContext, IdSlot, QueryBackend, RowCursor, collect_ids},
        iterable::{IterableNode, VecIterable},
        query::{CompiledQuery, Condition, Select},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    id::EntityId,
    obs::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all},
};
use std::{cell::RefCell, sync::Mutex};

fn eid(local: u64) -> EntityId {
    EntityId::new(4, local)
}

fn sorted(values: &[u64]) -> IterableNode {
    IterableNode::leaf(VecIterable::sorted(values.iter().copied().map(eid).collect()))
}

fn selecting(select: Select) -> IterableNode {
    IterableNode::leaf(VecIterable::sorted(Vec::new()).with_select(select))
}

fn issues_named(name: &str) -> IterableNode {
    selecting(Select::find("Issue", Condition::eq("name", name)))
}

///
/// VecRowCursor
///

struct VecRowCursor {
    rows: std::vec::IntoIter<IdSlot>,
}

impl RowCursor for VecRowCursor {
    fn next_row(&mut self) -> Result<Option<IdSlot>, InternalError> {
        Ok(self.rows.next())
    }
}

///
/// RecordingBackend
///
/// Remembers every query it was asked to run and answers with fixed rows.
///

struct RecordingBackend {
    rows: Vec<IdSlot>,
    seen: RefCell<Vec<CompiledQuery>>,
}

impl RecordingBackend {
    fn answering(rows: Vec<IdSlot>) -> Self {
        Self {
            rows,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl QueryBackend for RecordingBackend {
    fn execute(&self, query: &CompiledQuery) -> Result<Box<dyn RowCursor>, InternalError> {
        self.seen.borrow_mut().push(query.clone());

        Ok(Box::new(VecRowCursor {
            rows: self.rows.clone().into_iter(),
        }))
    }
}

struct RefusingBackend;

impl QueryBackend for RefusingBackend {
    fn execute(&self, _query: &CompiledQuery) -> Result<Box<dyn RowCursor>, InternalError> {
        Err(InternalError::backend_internal("connection refused"))
    }
}

///
/// CapturingSink
///

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

static SESSION_CAPTURE: CapturingSink = CapturingSink {
    events: Mutex::new(Vec::new()),
};

// ---------------------------------------------------------------------
// Local evaluation
// ---------------------------------------------------------------------

#[test]
fn collect_and_size_evaluate_locally() {
    let session = DbSession::new();
    let node = sorted(&[1, 3, 5]).union(sorted(&[2, 3, 4]));

    let ids = session.collect(&node).expect("union should evaluate");
    assert_eq!(ids, [1, 2, 3, 4, 5].map(|local| Some(eid(local))).to_vec());
    assert_eq!(session.size(&node).expect("size should evaluate"), 5);
}

#[test]
fn reverse_iterator_routes_through_session() {
    let session = DbSession::new();
    let node = sorted(&[1, 2, 3, 4]).minus(sorted(&[2]));

    let mut iter = session
        .reverse_iterator(&node)
        .expect("reverse iterator should open");
    let ids = collect_ids(iter.as_mut()).expect("reverse iterator should drain");

    assert_eq!(ids, [4, 3, 1].map(|local| Some(eid(local))).to_vec());
}

// ---------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------

#[test]
fn compile_folds_same_class_intersection() {
    let session = DbSession::new();
    let node = issues_named("issue2").intersect(selecting(Select::find(
        "Issue",
        Condition::eq("priority", "normal"),
    )));

    let compiled = session.compile(&node).expect("tree should compile");

    assert_eq!(
        compiled.sql,
        "SELECT FROM Issue WHERE (name = :name0 AND priority = :priority1)"
    );
    assert_eq!(compiled.params.len(), 2);
}

#[test]
fn each_compile_starts_a_fresh_parameter_namespace() {
    let session = DbSession::new();
    let node = issues_named("a");

    let first = session.compile(&node).expect("first compile should succeed");
    let second = session.compile(&node).expect("second compile should succeed");

    assert_eq!(first, second);
    assert!(first.params.contains_key("name0"));
}

#[test]
fn compile_count_wraps_the_select() {
    let session = DbSession::new();

    let compiled = session
        .compile_count(&issues_named("a"))
        .expect("count should compile");

    assert_eq!(
        compiled.sql,
        "SELECT COUNT(*) AS count FROM (SELECT FROM Issue WHERE name = :name0)"
    );
}

#[test]
fn union_semantics_follow_session_config() {
    let node = selecting(Select::all_of("Issue")).union(selecting(Select::all_of("Project")));

    let as_set = DbSession::new()
        .compile(&node)
        .expect("default union should compile");
    assert!(as_set.sql.contains(".asSet()"));

    let config = EngineConfig::from_toml_str("distinct_union_as_set = false\n")
        .expect("config should parse");
    let plain = DbSession::with_config(config)
        .compile(&node)
        .expect("plain union should compile");
    assert!(plain.sql.contains("unionall("));
    assert!(!plain.sql.contains(".asSet()"));
}

#[test]
fn debug_flag_reaches_eval_context() {
    let session = DbSession::new().debug(true);

    assert!(session.config().debug);
    assert_eq!(
        session.ctx(),
        EvalContext::from_config(&EngineConfig::default().with_debug(true))
    );
}

// ---------------------------------------------------------------------
// Remote execution
// ---------------------------------------------------------------------

#[test]
fn execute_remote_sends_compiled_query_and_streams_rows() {
    metrics_reset_all();
    let backend = RecordingBackend::answering(vec![Some(eid(7)), None, Some(eid(9))]);
    let session = DbSession::new();

    let mut iter = session
        .execute_remote(&issues_named("issue2"), &backend)
        .expect("remote execution should start");
    let rows = collect_ids(iter.as_mut()).expect("cursor should drain");

    assert_eq!(rows, vec![Some(eid(7)), None, Some(eid(9))]);

    let seen = backend.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].sql, "SELECT FROM Issue WHERE name = :name0");

    let report = metrics_report();
    assert_eq!(report.ops.remote_queries, 1);
    assert_eq!(report.ops.remote_rows, 3);
}

#[test]
fn backend_failure_propagates() {
    let err = DbSession::new()
        .execute_remote(&issues_named("a"), &RefusingBackend)
        .err()
        .expect("backend failure must surface");

    assert_eq!(err.origin, ErrorOrigin::Backend);
    assert_eq!(err.class, ErrorClass::Internal);
}

#[test]
fn uncompilable_leaf_never_reaches_backend() {
    let backend = RecordingBackend::answering(Vec::new());
    let node = IterableNode::leaf(VecIterable::from_slots(vec![Some(eid(1)), None]));

    let err = DbSession::new()
        .execute_remote(&node, &backend)
        .err()
        .expect("leaf with null slots cannot compile");

    assert_eq!(err.class, ErrorClass::Unsupported);
    assert!(err.is_fatal());
    assert!(backend.seen.borrow().is_empty());
}

// ---------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------

#[test]
fn session_sink_captures_events_instead_of_global_state() {
    metrics_reset_all();
    let session = DbSession::new().metrics_sink(&SESSION_CAPTURE);

    session
        .compile(&issues_named("a"))
        .expect("select should compile");
    session
        .collect(&sorted(&[1, 2]).union(sorted(&[3])))
        .expect("union should evaluate");

    let captured = SESSION_CAPTURE
        .events
        .lock()
        .expect("capture lock should not be poisoned")
        .clone();
    assert!(captured.contains(&MetricsEvent::QueryCompiled {
        compositions: 0,
        params: 1,
    }));
    assert!(captured.contains(&MetricsEvent::IteratorOpened { op: "union" }));

    let report = metrics_report();
    assert_eq!(report.ops.queries_compiled, 0);
    assert_eq!(report.ops.iterators_opened, 0);
}
