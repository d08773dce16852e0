use crate::{
    db::executor::stream::contracts::{BoxedIdIterator, IdSlot},
    error::InternalError,
};

///
/// LaneState
///
/// Lookahead state of one merge lane (or one memoized output slot).
/// `Exhausted` is terminal: a lane in that state is never polled again.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LaneState {
    Pending,
    Value(IdSlot),
    Exhausted,
}

impl LaneState {
    // Consume a held value, returning the lane to `Pending`.
    pub(crate) const fn take(&mut self) -> Option<IdSlot> {
        match *self {
            Self::Value(slot) => {
                *self = Self::Pending;
                Some(slot)
            }
            Self::Pending | Self::Exhausted => None,
        }
    }
}

///
/// Lane
///
/// One side of a binary merge: the child iterator plus its lookahead slot.
///

pub(crate) struct Lane {
    source: BoxedIdIterator,
    state: LaneState,
}

impl Lane {
    pub(crate) const fn new(source: BoxedIdIterator) -> Self {
        Self {
            source,
            state: LaneState::Pending,
        }
    }

    // Ensure one lookahead slot is loaded and return it, or `None` at end.
    pub(crate) fn head(&mut self) -> Result<Option<IdSlot>, InternalError> {
        if matches!(self.state, LaneState::Pending) {
            self.state = if self.source.has_next()? {
                LaneState::Value(self.source.next_id()?)
            } else {
                LaneState::Exhausted
            };
        }

        Ok(match self.state {
            LaneState::Value(slot) => Some(slot),
            LaneState::Pending | LaneState::Exhausted => None,
        })
    }

    // Drop the current head so the next `head` call pulls a fresh slot.
    pub(crate) const fn advance(&mut self) {
        let _ = self.state.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::executor::stream::contracts::VecIdIterator, id::EntityId};

    #[test]
    fn lane_head_is_idempotent_until_advanced() {
        let one = Some(EntityId::new(0, 1));
        let two = Some(EntityId::new(0, 2));
        let mut lane = Lane::new(VecIdIterator::boxed(vec![one, two]));

        assert_eq!(lane.head().expect("head should load"), Some(one));
        assert_eq!(lane.head().expect("head should repeat"), Some(one));
        lane.advance();
        assert_eq!(lane.head().expect("head should load next"), Some(two));
        lane.advance();
        assert_eq!(lane.head().expect("exhausted head"), None);
        assert_eq!(lane.state, LaneState::Exhausted);
    }

    #[test]
    fn null_slot_is_a_value_not_exhaustion() {
        let mut lane = Lane::new(VecIdIterator::boxed(vec![None]));

        assert_eq!(lane.head().expect("head should load"), Some(None));
        lane.advance();
        assert_eq!(lane.head().expect("exhausted head"), None);
    }
}
