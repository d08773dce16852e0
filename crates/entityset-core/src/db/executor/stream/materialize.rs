//! Module: executor::stream::materialize
//! Responsibility: drain-and-reorder fallback for children whose order cannot be
//! consumed lazily (unsorted merge inputs, sort/distinct nodes, reverse of
//! unsorted shapes).

use crate::{
    db::{
        direction::Direction,
        executor::{
            context::EvalContext,
            stream::{
                contracts::{BoxedIdIterator, IdSlot, IdStream, collect_ids},
                order::IdOrderComparator,
            },
        },
    },
    error::InternalError,
};
use std::collections::HashSet;

///
/// MaterializeMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum MaterializeMode {
    /// Sort by id; duplicates kept.
    Sort(Direction),
    /// Sort by id and keep one copy of each id.
    SortDistinct(Direction),
    /// Emit the drained sequence back to front.
    Reverse,
}

enum Materialize {
    Pending(BoxedIdIterator),
    Ready(std::vec::IntoIter<IdSlot>),
}

///
/// MaterializedStream
///
/// Drains its child on the first pull, reorders once, then replays.
///

pub(crate) struct MaterializedStream {
    state: Materialize,
    mode: MaterializeMode,
    op: &'static str,
    ctx: EvalContext,
    total_count_hint: Option<usize>,
}

impl MaterializedStream {
    pub(crate) fn new(
        inner: BoxedIdIterator,
        mode: MaterializeMode,
        op: &'static str,
        ctx: EvalContext,
    ) -> Self {
        let total_count_hint = match mode {
            MaterializeMode::Sort(_) | MaterializeMode::Reverse => inner.exact_count_hint(),
            MaterializeMode::SortDistinct(_) => None,
        };

        Self {
            state: Materialize::Pending(inner),
            mode,
            op,
            ctx,
            total_count_hint,
        }
    }

    fn reorder(&self, mut slots: Vec<IdSlot>) -> Vec<IdSlot> {
        match self.mode {
            MaterializeMode::Sort(direction) => {
                IdOrderComparator::from_direction(direction).sort(&mut slots);
            }
            MaterializeMode::SortDistinct(direction) => {
                let unique: HashSet<IdSlot> = slots.drain(..).collect();
                slots.extend(unique);
                IdOrderComparator::from_direction(direction).sort(&mut slots);
            }
            MaterializeMode::Reverse => slots.reverse(),
        }

        slots
    }
}

impl IdStream for MaterializedStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        if let Materialize::Pending(inner) = &mut self.state {
            let drained = collect_ids(inner.as_mut())?;
            self.ctx.note_materialized(self.op, drained.len());
            self.state = Materialize::Ready(self.reorder(drained).into_iter());
        }

        match &mut self.state {
            Materialize::Ready(slots) => Ok(slots.next()),
            Materialize::Pending(_) => Err(InternalError::executor_invariant(
                "materialized stream polled before materialization",
            )),
        }
    }

    fn exact_count_hint(&self) -> Option<usize> {
        self.total_count_hint
    }
}
