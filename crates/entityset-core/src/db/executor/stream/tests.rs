use crate::{
    db::{
        direction::Direction,
        executor::{
            context::EvalContext,
            stream::{
                AdjacentDistinctStream, BoxedIdIterator, BudgetedIdStream, ConcatStream,
                EntityIdIterator, HashIntersectStream, HashMinusStream, IdOrderComparator, IdSlot,
                MaterializeMode, MaterializedStream, MergeIntersectStream, MergeMinusStream,
                MergeUnionStream, ProbeSet, Pulled, SkipIdStream, VecIdIterator, collect_ids,
            },
        },
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    id::EntityId,
};
use std::{cell::Cell, collections::HashSet, rc::Rc};

fn id(value: u64) -> IdSlot {
    Some(EntityId::new(1, value))
}

fn ids(values: &[u64]) -> Vec<IdSlot> {
    values.iter().copied().map(id).collect()
}

fn vec_iter(values: &[u64]) -> BoxedIdIterator {
    VecIdIterator::boxed(ids(values))
}

fn asc() -> IdOrderComparator {
    IdOrderComparator::from_direction(Direction::Asc)
}

fn probe_from(
    source: impl FnOnce() -> Result<HashSet<IdSlot>, InternalError> + 'static,
) -> ProbeSet {
    ProbeSet::new(Box::new(source))
}

fn probe_of(values: &[u64]) -> ProbeSet {
    let set: HashSet<IdSlot> = ids(values).into_iter().collect();
    probe_from(move || Ok(set))
}

fn drain(mut iter: BoxedIdIterator) -> Vec<IdSlot> {
    collect_ids(iter.as_mut()).expect("stream drain should succeed")
}

struct FailingIdIterator {
    remaining: Vec<IdSlot>,
}

impl EntityIdIterator for FailingIdIterator {
    fn has_next(&mut self) -> Result<bool, InternalError> {
        if self.remaining.is_empty() {
            return Err(InternalError::backend_internal("forced cursor failure"));
        }

        Ok(true)
    }

    fn next_id(&mut self) -> Result<IdSlot, InternalError> {
        Ok(self.remaining.remove(0))
    }
}

#[test]
fn merge_union_emits_equal_heads_once() {
    let union = Pulled::boxed(MergeUnionStream::new(
        vec_iter(&[1, 3, 5]),
        vec_iter(&[2, 3, 6]),
        asc(),
    ));

    assert_eq!(drain(union), ids(&[1, 2, 3, 5, 6]));
}

#[test]
fn merge_union_suppresses_duplicates_within_one_side() {
    let union = Pulled::boxed(MergeUnionStream::new(
        vec_iter(&[1, 1, 2]),
        vec_iter(&[2, 2]),
        asc(),
    ));

    assert_eq!(drain(union), ids(&[1, 2]));
}

#[test]
fn merge_union_under_desc_comparator_merges_descending_children() {
    let union = Pulled::boxed(MergeUnionStream::new(
        vec_iter(&[5, 3, 1]),
        vec_iter(&[4, 3]),
        IdOrderComparator::from_direction(Direction::Desc),
    ));

    assert_eq!(drain(union), ids(&[5, 4, 3, 1]));
}

#[test]
fn merge_intersect_advances_lagging_side() {
    let intersect = Pulled::boxed(MergeIntersectStream::new(
        vec_iter(&[1, 2, 4, 7, 9]),
        vec_iter(&[2, 3, 7, 8, 9, 10]),
        asc(),
    ));

    assert_eq!(drain(intersect), ids(&[2, 7, 9]));
}

#[test]
fn merge_intersect_stops_when_one_side_is_exhausted() {
    let mut intersect = Pulled::boxed(MergeIntersectStream::new(
        vec_iter(&[1]),
        Box::new(FailingIdIterator {
            remaining: ids(&[1, 2]),
        }),
        asc(),
    ));

    assert!(intersect.has_next().expect("first match should resolve"));
    assert_eq!(intersect.next_id().expect("first match"), id(1));
    assert!(
        !intersect.has_next().expect("left exhaustion must end the stream"),
        "exhausted left side must short-circuit before polling right again"
    );
}

#[test]
fn merge_minus_discards_equal_heads_and_passes_remainder() {
    let minus = Pulled::boxed(MergeMinusStream::new(
        vec_iter(&[1, 2, 3, 5, 8, 9]),
        vec_iter(&[2, 5, 6]),
        asc(),
    ));

    assert_eq!(drain(minus), ids(&[1, 3, 8, 9]));
}

#[test]
fn merge_minus_discards_repeated_minuend_matches() {
    let minus = Pulled::boxed(MergeMinusStream::new(
        vec_iter(&[2, 2, 3]),
        vec_iter(&[2]),
        asc(),
    ));

    assert_eq!(drain(minus), ids(&[3]));
}

#[test]
fn merge_streams_propagate_child_errors() {
    let mut union = Pulled::boxed(MergeUnionStream::new(
        vec_iter(&[1, 2]),
        Box::new(FailingIdIterator {
            remaining: Vec::new(),
        }),
        asc(),
    ));

    let err = union
        .has_next()
        .expect_err("child failure must surface through the merge");
    assert_eq!(err.class, ErrorClass::Internal);
    assert_eq!(err.origin, ErrorOrigin::Backend);
}

#[test]
fn pulled_has_next_is_idempotent_until_consumed() {
    let mut union = Pulled::boxed(MergeUnionStream::new(
        vec_iter(&[1]),
        vec_iter(&[2]),
        asc(),
    ));

    for _ in 0..3 {
        assert!(union.has_next().expect("has_next should succeed"));
    }
    assert_eq!(union.next_id().expect("first id"), id(1));
    assert_eq!(union.next_id().expect("second id"), id(2));
    assert!(!union.has_next().expect("exhausted"));

    let err = union
        .next_id()
        .expect_err("next_id past the end must fail");
    assert_eq!(err.class, ErrorClass::InvariantViolation);
}

#[test]
fn hash_probe_is_built_on_first_pull_not_construction() {
    let built = Rc::new(Cell::new(false));
    let flag = Rc::clone(&built);
    let probe = probe_from(move || {
        flag.set(true);
        Ok(ids(&[3, 1]).into_iter().collect())
    });

    let mut intersect = Pulled::boxed(HashIntersectStream::new(
        probe,
        vec_iter(&[1, 2, 3]),
        EvalContext::default(),
    ));
    assert!(!built.get(), "probe set must not be built at construction");

    assert!(intersect.has_next().expect("first pull should succeed"));
    assert!(built.get(), "probe set must be built on first pull");
    assert_eq!(
        collect_ids(intersect.as_mut()).expect("drain should succeed"),
        ids(&[1, 3])
    );
}

#[test]
fn hash_intersect_emits_streamed_order_once_per_id() {
    let intersect = Pulled::boxed(HashIntersectStream::new(
        probe_of(&[2, 4, 6]),
        vec_iter(&[6, 4, 4, 5, 2]),
        EvalContext::default(),
    ));

    assert_eq!(drain(intersect), ids(&[6, 4, 2]));
}

#[test]
fn hash_probe_source_errors_propagate() {
    let probe = probe_from(|| Err(InternalError::backend_internal("probe source failed")));
    let mut minus = Pulled::boxed(HashMinusStream::new(
        vec_iter(&[1]),
        probe,
        EvalContext::default(),
    ));

    let err = minus.has_next().expect_err("probe build failure must surface");
    assert_eq!(err.origin, ErrorOrigin::Backend);
}

#[test]
fn failed_probe_build_is_terminal() {
    let mut minus = Pulled::boxed(HashMinusStream::new(
        vec_iter(&[1, 2]),
        probe_from(|| Err(InternalError::backend_internal("probe source failed"))),
        EvalContext::default(),
    ));
    minus.has_next().expect_err("first pull must fail");
    let err = minus.has_next().expect_err("later pulls must keep failing");
    assert_eq!(err.origin, ErrorOrigin::Backend);
    assert_eq!(err.message, "probe source failed");

    let mut intersect = Pulled::boxed(HashIntersectStream::new(
        probe_from(|| Err(InternalError::backend_internal("probe source failed"))),
        vec_iter(&[1, 2]),
        EvalContext::default(),
    ));
    intersect.has_next().expect_err("first pull must fail");
    assert!(
        intersect.has_next().is_err(),
        "an exhausted-looking stream would hide the failure"
    );
}

#[test]
fn hash_minus_filters_minuend_preserving_order() {
    let minus = Pulled::boxed(HashMinusStream::new(
        vec_iter(&[9, 1, 5, 3, 5]),
        probe_of(&[3, 9]),
        EvalContext::default(),
    ));

    assert_eq!(drain(minus), ids(&[1, 5, 5]));
}

#[test]
fn concat_preserves_order_and_duplicates_and_sums_hints() {
    let concat = Pulled::boxed(ConcatStream::new(vec_iter(&[3, 1, 3]), vec_iter(&[1, 2])));

    assert_eq!(concat.exact_count_hint(), Some(5));
    assert_eq!(drain(concat), ids(&[3, 1, 3, 1, 2]));
}

#[test]
fn adjacent_distinct_drops_runs() {
    let distinct = Pulled::boxed(AdjacentDistinctStream::new(vec_iter(&[1, 1, 2, 2, 2, 3])));

    assert_eq!(drain(distinct), ids(&[1, 2, 3]));
}

#[test]
fn materialized_sort_places_nulls_last() {
    let sorted = Pulled::boxed(MaterializedStream::new(
        VecIdIterator::boxed(vec![None, id(3), id(1)]),
        MaterializeMode::Sort(Direction::Asc),
        "sort",
        EvalContext::default(),
    ));

    assert_eq!(sorted.exact_count_hint(), Some(3));
    assert_eq!(drain(sorted), vec![id(1), id(3), None]);
}

#[test]
fn materialized_sort_distinct_dedupes_unsorted_input() {
    let distinct = Pulled::boxed(MaterializedStream::new(
        vec_iter(&[4, 2, 4, 1, 2]),
        MaterializeMode::SortDistinct(Direction::Asc),
        "distinct",
        EvalContext::default(),
    ));

    assert_eq!(distinct.exact_count_hint(), None);
    assert_eq!(drain(distinct), ids(&[1, 2, 4]));
}

#[test]
fn materialized_reverse_replays_back_to_front() {
    let reversed = Pulled::boxed(MaterializedStream::new(
        vec_iter(&[3, 1, 2]),
        MaterializeMode::Reverse,
        "reverse",
        EvalContext::default(),
    ));

    assert_eq!(drain(reversed), ids(&[2, 1, 3]));
}

#[test]
fn skip_then_budget_bounds_window_and_hints() {
    let skipped = Pulled::boxed(SkipIdStream::new(vec_iter(&[1, 2, 3, 4, 5]), 1));
    let window = Pulled::boxed(BudgetedIdStream::new(skipped, 2));

    assert_eq!(window.exact_count_hint(), Some(2));
    assert_eq!(drain(window), ids(&[2, 3]));
}

#[test]
fn skip_past_end_yields_nothing() {
    let skipped = Pulled::boxed(SkipIdStream::new(vec_iter(&[1, 2]), 5));

    assert_eq!(skipped.exact_count_hint(), Some(0));
    assert_eq!(drain(skipped), Vec::new());
}

#[test]
fn budget_stops_polling_inner_once_spent() {
    let window = Pulled::boxed(BudgetedIdStream::new(
        Box::new(FailingIdIterator {
            remaining: ids(&[1]),
        }),
        1,
    ));

    assert_eq!(
        drain(window),
        ids(&[1]),
        "spent budget must not poll the failing inner iterator"
    );
}
