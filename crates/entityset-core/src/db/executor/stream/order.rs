//! Module: executor::stream::order
//! Responsibility: comparator policy for id streams.
//! Boundary: centralizes ASC/DESC and null placement for every combinator.

use crate::db::{direction::Direction, executor::stream::contracts::IdSlot};
use std::cmp::Ordering;

///
/// IdOrderComparator
///
/// Comparator for merge decisions and sort-on-demand materialization.
///
/// Null slots sort after every present id in ascending order (and therefore
/// first in descending order). This placement is a compatibility policy
/// carried over from unsorted materialization; nothing else depends on it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct IdOrderComparator {
    direction: Direction,
}

impl IdOrderComparator {
    #[must_use]
    pub(crate) const fn from_direction(direction: Direction) -> Self {
        Self { direction }
    }

    pub(crate) fn compare(self, left: &IdSlot, right: &IdSlot) -> Ordering {
        let ascending = match (left, right) {
            (Some(left), Some(right)) => left.cmp(right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        match self.direction {
            Direction::Asc => ascending,
            Direction::Desc => ascending.reverse(),
        }
    }

    // Stable sort under this comparator.
    pub(crate) fn sort(self, slots: &mut [IdSlot]) {
        slots.sort_by(|left, right| self.compare(left, right));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;

    #[test]
    fn nulls_sort_last_ascending_and_first_descending() {
        let mut slots = vec![None, Some(EntityId::new(0, 2)), Some(EntityId::new(0, 1))];

        IdOrderComparator::from_direction(Direction::Asc).sort(&mut slots);
        assert_eq!(
            slots,
            vec![Some(EntityId::new(0, 1)), Some(EntityId::new(0, 2)), None]
        );

        IdOrderComparator::from_direction(Direction::Desc).sort(&mut slots);
        assert_eq!(
            slots,
            vec![None, Some(EntityId::new(0, 2)), Some(EntityId::new(0, 1))]
        );
    }
}
