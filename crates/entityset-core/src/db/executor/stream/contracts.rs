use crate::{db::executor::stream::lane::LaneState, error::InternalError, id::EntityId};

///
/// IdSlot
///
/// One position in an id stream. `None` is a null id slot (for example a link
/// whose target no longer exists); it is data, not end-of-stream.
///

pub type IdSlot = Option<EntityId>;

///
/// EntityIdIterator
///
/// Single-pass, forward-only pull protocol over entity ids.
///
/// `has_next` may be called any number of times before `next_id`; the id it
/// finds is memoized until consumed. Calling `next_id` on an exhausted
/// iterator is an error.
///

pub trait EntityIdIterator {
    fn has_next(&mut self) -> Result<bool, InternalError>;

    fn next_id(&mut self) -> Result<IdSlot, InternalError>;

    // Exact total number of ids this iterator emits, when cheaply known.
    // Must stay stable across consumption.
    fn exact_count_hint(&self) -> Option<usize> {
        None
    }
}

pub type BoxedIdIterator = Box<dyn EntityIdIterator>;

impl<T> EntityIdIterator for Box<T>
where
    T: EntityIdIterator + ?Sized,
{
    fn has_next(&mut self) -> Result<bool, InternalError> {
        self.as_mut().has_next()
    }

    fn next_id(&mut self) -> Result<IdSlot, InternalError> {
        self.as_mut().next_id()
    }

    fn exact_count_hint(&self) -> Option<usize> {
        self.as_ref().exact_count_hint()
    }
}

/// Drain an iterator into a vector, preserving emission order.
pub fn collect_ids(iter: &mut dyn EntityIdIterator) -> Result<Vec<IdSlot>, InternalError> {
    let mut out = Vec::with_capacity(iter.exact_count_hint().unwrap_or(0));
    while iter.has_next()? {
        out.push(iter.next_id()?);
    }

    Ok(out)
}

///
/// IdStream
///
/// Internal step contract for combinator state machines: one call yields the
/// next slot or `None` at end. `Pulled` adapts it to the public protocol.
///

pub(crate) trait IdStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError>;

    fn exact_count_hint(&self) -> Option<usize> {
        None
    }
}

///
/// Pulled
///
/// Adapter that memoizes one stepped slot so `has_next` stays idempotent.
///

pub(crate) struct Pulled<S> {
    stream: S,
    lookahead: LaneState,
}

impl<S> Pulled<S>
where
    S: IdStream + 'static,
{
    pub(crate) fn boxed(stream: S) -> BoxedIdIterator {
        Box::new(Self {
            stream,
            lookahead: LaneState::Pending,
        })
    }
}

impl<S> EntityIdIterator for Pulled<S>
where
    S: IdStream,
{
    fn has_next(&mut self) -> Result<bool, InternalError> {
        if matches!(self.lookahead, LaneState::Pending) {
            self.lookahead = match self.stream.next_slot()? {
                Some(slot) => LaneState::Value(slot),
                None => LaneState::Exhausted,
            };
        }

        Ok(matches!(self.lookahead, LaneState::Value(_)))
    }

    fn next_id(&mut self) -> Result<IdSlot, InternalError> {
        if !self.has_next()? {
            return Err(InternalError::executor_invariant(
                "next_id called on an exhausted id iterator",
            ));
        }

        self.lookahead.take().ok_or_else(|| {
            InternalError::executor_invariant("id iterator lookahead vanished before consumption")
        })
    }

    fn exact_count_hint(&self) -> Option<usize> {
        self.stream.exact_count_hint()
    }
}

///
/// VecIdIterator
///
/// Iterator over one materialized id vector, in vector order.
///

#[derive(Debug)]
pub struct VecIdIterator {
    ids: std::vec::IntoIter<IdSlot>,
    total_len: usize,
}

impl VecIdIterator {
    #[must_use]
    pub fn new(ids: Vec<IdSlot>) -> Self {
        let total_len = ids.len();

        Self {
            ids: ids.into_iter(),
            total_len,
        }
    }

    #[must_use]
    pub fn boxed(ids: Vec<IdSlot>) -> BoxedIdIterator {
        Box::new(Self::new(ids))
    }
}

impl EntityIdIterator for VecIdIterator {
    fn has_next(&mut self) -> Result<bool, InternalError> {
        Ok(!self.ids.as_slice().is_empty())
    }

    fn next_id(&mut self) -> Result<IdSlot, InternalError> {
        self.ids.next().ok_or_else(|| {
            InternalError::executor_invariant("next_id called on an exhausted id iterator")
        })
    }

    fn exact_count_hint(&self) -> Option<usize> {
        Some(self.total_len)
    }
}

///
/// EmptyIdIterator
///

#[derive(Debug, Default)]
pub struct EmptyIdIterator;

impl EmptyIdIterator {
    #[must_use]
    pub fn boxed() -> BoxedIdIterator {
        Box::new(Self)
    }
}

impl EntityIdIterator for EmptyIdIterator {
    fn has_next(&mut self) -> Result<bool, InternalError> {
        Ok(false)
    }

    fn next_id(&mut self) -> Result<IdSlot, InternalError> {
        Err(InternalError::executor_invariant(
            "next_id called on an empty id iterator",
        ))
    }

    fn exact_count_hint(&self) -> Option<usize> {
        Some(0)
    }
}

///
/// SkipIdStream
///
/// Drops the first `count` ids of the inner iterator, lazily on first pull.
///

pub(crate) struct SkipIdStream {
    inner: BoxedIdIterator,
    remaining_skip: usize,
    total_count_hint: Option<usize>,
}

impl SkipIdStream {
    pub(crate) fn new(inner: BoxedIdIterator, count: usize) -> Self {
        let total_count_hint = inner
            .exact_count_hint()
            .map(|total| total.saturating_sub(count));

        Self {
            inner,
            remaining_skip: count,
            total_count_hint,
        }
    }
}

impl IdStream for SkipIdStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        while self.remaining_skip > 0 {
            if !self.inner.has_next()? {
                self.remaining_skip = 0;
                return Ok(None);
            }
            self.inner.next_id()?;
            self.remaining_skip -= 1;
        }

        if self.inner.has_next()? {
            Ok(Some(self.inner.next_id()?))
        } else {
            Ok(None)
        }
    }

    fn exact_count_hint(&self) -> Option<usize> {
        self.total_count_hint
    }
}

///
/// BudgetedIdStream
///
/// Caps upstream production after a fixed number of emitted ids.
/// Once the budget is spent, the inner iterator is never polled again.
///

pub(crate) struct BudgetedIdStream {
    inner: BoxedIdIterator,
    remaining: usize,
    total_count_hint: Option<usize>,
}

impl BudgetedIdStream {
    pub(crate) fn new(inner: BoxedIdIterator, remaining: usize) -> Self {
        let total_count_hint = inner
            .exact_count_hint()
            .map(|count| count.min(remaining));

        Self {
            inner,
            remaining,
            total_count_hint,
        }
    }
}

impl IdStream for BudgetedIdStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        if self.remaining == 0 {
            return Ok(None);
        }

        if self.inner.has_next()? {
            self.remaining = self.remaining.saturating_sub(1);
            Ok(Some(self.inner.next_id()?))
        } else {
            self.remaining = 0;
            Ok(None)
        }
    }

    fn exact_count_hint(&self) -> Option<usize> {
        self.total_count_hint
    }
}
