//! Module: executor::stream::composite
//! Responsibility: sort-merge state machines for union, intersection and minus.
//! Does not own: child sortedness; callers only build these over children
//! already ordered under the supplied comparator.

use crate::{
    db::executor::stream::{
        contracts::{BoxedIdIterator, IdSlot, IdStream},
        lane::Lane,
        order::IdOrderComparator,
    },
    error::InternalError,
};
use std::cmp::Ordering;

///
/// MergeUnionStream
///
/// Pull-based union over two ordered id streams.
/// The lower head wins and only that lane advances; equal heads advance both
/// lanes and emit once. Consecutive duplicates are suppressed.
///

pub(crate) struct MergeUnionStream {
    left: Lane,
    right: Lane,
    comparator: IdOrderComparator,
    last_emitted: Option<IdSlot>,
}

impl MergeUnionStream {
    pub(crate) const fn new(
        left: BoxedIdIterator,
        right: BoxedIdIterator,
        comparator: IdOrderComparator,
    ) -> Self {
        Self {
            left: Lane::new(left),
            right: Lane::new(right),
            comparator,
            last_emitted: None,
        }
    }
}

impl IdStream for MergeUnionStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        loop {
            let next = match (self.left.head()?, self.right.head()?) {
                (None, None) => return Ok(None),
                (Some(left), None) => {
                    self.left.advance();
                    left
                }
                (None, Some(right)) => {
                    self.right.advance();
                    right
                }
                (Some(left), Some(right)) => match self.comparator.compare(&left, &right) {
                    Ordering::Less => {
                        self.left.advance();
                        left
                    }
                    Ordering::Greater => {
                        self.right.advance();
                        right
                    }
                    Ordering::Equal => {
                        self.left.advance();
                        self.right.advance();
                        left
                    }
                },
            };

            if self.last_emitted == Some(next) {
                continue;
            }

            self.last_emitted = Some(next);
            return Ok(Some(next));
        }
    }
}

///
/// MergeIntersectStream
///
/// Pull-based intersection over two ordered id streams.
/// The lagging lane advances until heads match or one lane is exhausted.
///

pub(crate) struct MergeIntersectStream {
    left: Lane,
    right: Lane,
    comparator: IdOrderComparator,
    last_emitted: Option<IdSlot>,
}

impl MergeIntersectStream {
    pub(crate) const fn new(
        left: BoxedIdIterator,
        right: BoxedIdIterator,
        comparator: IdOrderComparator,
    ) -> Self {
        Self {
            left: Lane::new(left),
            right: Lane::new(right),
            comparator,
            last_emitted: None,
        }
    }
}

impl IdStream for MergeIntersectStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        loop {
            // Once either lane is exhausted no further output is possible.
            let Some(left) = self.left.head()? else {
                return Ok(None);
            };
            let Some(right) = self.right.head()? else {
                return Ok(None);
            };

            match self.comparator.compare(&left, &right) {
                Ordering::Less => self.left.advance(),
                Ordering::Greater => self.right.advance(),
                Ordering::Equal => {
                    self.left.advance();
                    self.right.advance();

                    if self.last_emitted == Some(left) {
                        continue;
                    }

                    self.last_emitted = Some(left);
                    return Ok(Some(left));
                }
            }
        }
    }
}

///
/// MergeMinusStream
///
/// Pull-based difference over two ordered id streams.
/// Same three-way walk as intersection, but equal heads are discarded and
/// subtrahend exhaustion passes the rest of the minuend through unchanged.
///

pub(crate) struct MergeMinusStream {
    minuend: Lane,
    subtrahend: Lane,
    comparator: IdOrderComparator,
}

impl MergeMinusStream {
    pub(crate) const fn new(
        minuend: BoxedIdIterator,
        subtrahend: BoxedIdIterator,
        comparator: IdOrderComparator,
    ) -> Self {
        Self {
            minuend: Lane::new(minuend),
            subtrahend: Lane::new(subtrahend),
            comparator,
        }
    }
}

impl IdStream for MergeMinusStream {
    fn next_slot(&mut self) -> Result<Option<IdSlot>, InternalError> {
        loop {
            let Some(current) = self.minuend.head()? else {
                return Ok(None);
            };
            let Some(excluded) = self.subtrahend.head()? else {
                self.minuend.advance();
                return Ok(Some(current));
            };

            match self.comparator.compare(&current, &excluded) {
                Ordering::Less => {
                    self.minuend.advance();
                    return Ok(Some(current));
                }
                Ordering::Greater => self.subtrahend.advance(),
                // Keep the subtrahend head: later minuend duplicates are discarded too.
                Ordering::Equal => self.minuend.advance(),
            }
        }
    }
}
