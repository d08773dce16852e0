use crate::{
    db::executor::stream::contracts::{BoxedIdIterator, IdSlot, IdStream},
    error::InternalError,
};

///
/// ConcatStream
///
/// Drains `first`, then `second`. No reordering and no deduplication, so
/// multiplicity and per-side order are preserved exactly.
///

pub(crate) struct ConcatStream {
    first: Option<BoxedIdIterator>,
    second: BoxedIdIterator,
    total_count_hint: Option<usize>,
}

impl ConcatStream {
    pub(crate) fn new(first: BoxedIdIterator, second: BoxedIdIterator) -> Self {
        let total_count_hint = first
            .exact_count_hint()
            .zip(second.exact_count_hint())
            .map(|(a, b)| a.saturating_add(b));

        Self {
            first: Some(first),
            second,
            total_count_hint,
        }
    }
}

impl IdStream for ConcatStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        if let Some(first) = self.first.as_mut() {
            if first.has_next()? {
                return Ok(Some(first.next_id()?));
            }
            // release the drained side
            self.first = None;
        }

        if self.second.has_next()? {
            Ok(Some(self.second.next_id()?))
        } else {
            Ok(None)
        }
    }

    fn exact_count_hint(&self) -> Option<usize> {
        self.total_count_hint
    }
}

///
/// AdjacentDistinctStream
///
/// Suppresses adjacent duplicates. Only a full distinct when the child is
/// ordered, which is the only case it is built for.
///

pub(crate) struct AdjacentDistinctStream {
    inner: BoxedIdIterator,
    last_emitted: Option<IdSlot>,
}

impl AdjacentDistinctStream {
    pub(crate) const fn new(inner: BoxedIdIterator) -> Self {
        Self {
            inner,
            last_emitted: None,
        }
    }
}

impl IdStream for AdjacentDistinctStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        while self.inner.has_next()? {
            let next = self.inner.next_id()?;
            if self.last_emitted == Some(next) {
                continue;
            }

            self.last_emitted = Some(next);
            return Ok(Some(next));
        }

        Ok(None)
    }
}
