//! Module: executor::stream
//! Responsibility: id-stream pull protocol, comparators, and the merge/hash
//! state machines behind every combinator.
//! Does not own: strategy selection; `db::iterable` picks which stream to build.

mod composite;
mod contracts;
mod lane;
mod materialize;
mod order;
mod probe;
mod sequence;

#[cfg(test)]
mod tests;

pub(crate) use composite::{MergeIntersectStream, MergeMinusStream, MergeUnionStream};
pub(crate) use contracts::{BudgetedIdStream, IdStream, Pulled, SkipIdStream};
pub use contracts::{
    BoxedIdIterator, EmptyIdIterator, EntityIdIterator, IdSlot, VecIdIterator, collect_ids,
};
pub(crate) use materialize::{MaterializeMode, MaterializedStream};
pub(crate) use order::IdOrderComparator;
pub(crate) use probe::{HashIntersectStream, HashMinusStream, IdSetSource, ProbeSet};
pub(crate) use sequence::{AdjacentDistinctStream, ConcatStream};
