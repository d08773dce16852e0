use crate::{
    db::{
        executor::stream::{BoxedIdIterator, IdSlot, VecIdIterator, collect_ids},
        query::Select,
    },
    error::{ErrorOrigin, InternalError},
    id::EntityId,
};
use std::collections::HashSet;

///
/// PrimitiveIterable
///
/// Capability a storage engine provides for one selector leaf.
///
/// `is_sorted_by_id` is structural: it must describe every iterator this leaf
/// returns. A leaf that claims sorted order but emits out-of-order ids breaks
/// merge-based combinators silently; combinators do not re-check it.
///

pub trait PrimitiveIterable {
    /// Short description used in explain output and error details.
    fn describe(&self) -> String;

    fn is_sorted_by_id(&self) -> bool;

    fn iterator(&self) -> Result<BoxedIdIterator, InternalError>;

    /// Iterate in reverse emission order.
    fn reverse_iterator(&self) -> Result<BoxedIdIterator, InternalError> {
        let mut ids = collect_ids(self.iterator()?.as_mut())?;
        ids.reverse();

        Ok(VecIdIterator::boxed(ids))
    }

    /// Membership set used by hash-probe fallbacks.
    fn to_id_set(&self) -> Result<HashSet<IdSlot>, InternalError> {
        let mut iter = self.iterator()?;
        let mut set = HashSet::with_capacity(self.count_hint().unwrap_or(0));
        while iter.has_next()? {
            set.insert(iter.next_id()?);
        }

        Ok(set)
    }

    /// Exact emitted count, when known without iterating.
    fn count_hint(&self) -> Option<usize> {
        None
    }

    /// Select AST leaf for remote compilation.
    fn select(&self) -> Result<Select, InternalError> {
        Err(InternalError::unsupported_operation(
            ErrorOrigin::Iterable,
            "compile",
            self.describe(),
        ))
    }
}

///
/// VecIterable
///
/// In-memory leaf over a fixed id list. Used for literal id sets and as the
/// reference leaf in tests.
///

#[derive(Clone, Debug)]
pub struct VecIterable {
    ids: Vec<IdSlot>,
    sorted: bool,
    select: Option<Select>,
}

impl VecIterable {
    /// Leaf that emits `ids` in id order.
    #[must_use]
    pub fn sorted(mut ids: Vec<EntityId>) -> Self {
        ids.sort_unstable();

        Self {
            ids: ids.into_iter().map(Some).collect(),
            sorted: true,
            select: None,
        }
    }

    /// Leaf that emits `ids` exactly as given.
    #[must_use]
    pub fn unsorted(ids: Vec<EntityId>) -> Self {
        Self::from_slots(ids.into_iter().map(Some).collect())
    }

    /// Unsorted leaf that may contain null slots.
    #[must_use]
    pub const fn from_slots(ids: Vec<IdSlot>) -> Self {
        Self {
            ids,
            sorted: false,
            select: None,
        }
    }

    /// Compile this leaf as `select` instead of a literal id list.
    #[must_use]
    pub fn with_select(mut self, select: Select) -> Self {
        self.select = Some(select);
        self
    }
}

impl PrimitiveIterable for VecIterable {
    fn describe(&self) -> String {
        format!(
            "ids[{}{}]",
            self.ids.len(),
            if self.sorted { ", sorted" } else { "" }
        )
    }

    fn is_sorted_by_id(&self) -> bool {
        self.sorted
    }

    fn iterator(&self) -> Result<BoxedIdIterator, InternalError> {
        Ok(VecIdIterator::boxed(self.ids.clone()))
    }

    fn reverse_iterator(&self) -> Result<BoxedIdIterator, InternalError> {
        Ok(VecIdIterator::boxed(self.ids.iter().rev().copied().collect()))
    }

    fn to_id_set(&self) -> Result<HashSet<IdSlot>, InternalError> {
        Ok(self.ids.iter().copied().collect())
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.ids.len())
    }

    fn select(&self) -> Result<Select, InternalError> {
        if let Some(select) = &self.select {
            return Ok(select.clone());
        }

        // Null slots have no record id to bind.
        let ids: Option<Vec<EntityId>> = self.ids.iter().copied().collect();
        ids.map(Select::record_ids).ok_or_else(|| {
            InternalError::unsupported_operation(ErrorOrigin::Iterable, "compile", self.describe())
        })
    }
}
