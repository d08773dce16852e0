//! Module: executor::stream::probe
//! Responsibility: hash-probe intersection and difference over one streamed side.
//! Does not own: choosing which side is hashed; the node layer decides that.

use crate::{
    db::executor::{
        context::EvalContext,
        stream::contracts::{BoxedIdIterator, IdSlot, IdStream},
    },
    error::InternalError,
};
use std::{collections::HashSet, mem};

pub(crate) type IdSetSource = Box<dyn FnOnce() -> Result<HashSet<IdSlot>, InternalError>>;

///
/// ProbeSet
///
/// Lazily built membership set for one side of a binary operator.
/// Leaves `Unmaterialized` exactly once; the source is consumed by that
/// transition and dropped with it. A failed build is terminal and every later
/// probe returns the same error.
///

pub(crate) enum ProbeSet {
    Unmaterialized(IdSetSource),
    Materialized(HashSet<IdSlot>),
    Failed(InternalError),
}

impl ProbeSet {
    pub(crate) fn new(source: IdSetSource) -> Self {
        Self::Unmaterialized(source)
    }

    fn materialize(
        &mut self,
        op: &'static str,
        ctx: EvalContext,
    ) -> Result<&mut HashSet<IdSlot>, InternalError> {
        if matches!(self, Self::Unmaterialized(_)) {
            let pending = mem::replace(
                self,
                Self::Failed(InternalError::executor_invariant(format!(
                    "{op}: probe set build did not complete"
                ))),
            );

            if let Self::Unmaterialized(source) = pending {
                *self = match source() {
                    Ok(set) => {
                        ctx.note_hash_probe(op, set.len());
                        Self::Materialized(set)
                    }
                    Err(err) => Self::Failed(err),
                };
            }
        }

        match self {
            Self::Materialized(set) => Ok(set),
            Self::Failed(err) => Err(err.clone()),
            Self::Unmaterialized(_) => Err(InternalError::executor_invariant(
                "probe set must be materialized before probing",
            )),
        }
    }
}

///
/// HashIntersectStream
///
/// Streams one side and emits the ids present in the probe set, in streamed
/// order. Each matched id is removed from the set so it is emitted once.
///

pub(crate) struct HashIntersectStream {
    probe: ProbeSet,
    streamed: BoxedIdIterator,
    ctx: EvalContext,
}

impl HashIntersectStream {
    pub(crate) const fn new(probe: ProbeSet, streamed: BoxedIdIterator, ctx: EvalContext) -> Self {
        Self {
            probe,
            streamed,
            ctx,
        }
    }
}

impl IdStream for HashIntersectStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        let set = self.probe.materialize("intersection", self.ctx)?;

        while !set.is_empty() && self.streamed.has_next()? {
            let slot = self.streamed.next_id()?;
            if set.remove(&slot) {
                return Ok(Some(slot));
            }
        }

        Ok(None)
    }
}

///
/// HashMinusStream
///
/// Filters the minuend against a hashed subtrahend, preserving minuend order.
///

pub(crate) struct HashMinusStream {
    minuend: BoxedIdIterator,
    excluded: ProbeSet,
    ctx: EvalContext,
}

impl HashMinusStream {
    pub(crate) const fn new(
        minuend: BoxedIdIterator,
        excluded: ProbeSet,
        ctx: EvalContext,
    ) -> Self {
        Self {
            minuend,
            excluded,
            ctx,
        }
    }
}

impl IdStream for HashMinusStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        let excluded = self.excluded.materialize("minus", self.ctx)?;

        while self.minuend.has_next()? {
            let slot = self.minuend.next_id()?;
            if !excluded.contains(&slot) {
                return Ok(Some(slot));
            }
        }

        Ok(None)
    }
}
