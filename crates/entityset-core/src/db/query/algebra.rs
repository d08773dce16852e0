//! Module: query::algebra
//! Responsibility: fold set operations over selects into flat selects where the
//! result set is provably unchanged, and compose them as sub-queries otherwise.
//! Does not own: rejecting bounded operands; that happens when the composed
//! select is compiled.

use crate::{
    db::query::{
        condition::Condition,
        order::Order,
        select::{
            BinaryOperationSelect, ClassSelect, DistinctSelect, RecordIdSelect, Select,
            SelectBounds, SetOperation,
        },
    },
    id::EntityId,
    obs::sink::{MetricsEvent, record},
};
use std::collections::HashSet;

/// Entities present in both selects.
#[must_use]
pub fn intersect(left: Select, right: Select) -> Select {
    combine(SetOperation::Intersect, left, right)
}

/// Entities present in either select, once each.
#[must_use]
pub fn union(left: Select, right: Select) -> Select {
    union_with(left, right, true)
}

/// Both selects back to back, duplicates kept. Never folded.
#[must_use]
pub fn union_all(left: Select, right: Select) -> Select {
    union_with(left, right, false)
}

/// Union rendered as `unionall(...).asSet()` when `as_set`, plain `unionall` otherwise.
#[must_use]
pub fn union_with(left: Select, right: Select, as_set: bool) -> Select {
    combine(SetOperation::Union { as_set }, left, right)
}

/// Entities of `left` not present in `right`.
#[must_use]
pub fn difference(left: Select, right: Select) -> Select {
    combine(SetOperation::Difference, left, right)
}

#[must_use]
pub fn distinct(select: Select) -> Select {
    if matches!(&select, Select::Distinct(inner) if !inner.bounds.is_bounded()) {
        return select;
    }

    Select::Distinct(DistinctSelect {
        inner: Box::new(select),
        bounds: SelectBounds::default(),
    })
}

/// Flip the select's order. Unordered selects are returned unchanged.
///
/// A bounded select keeps the rows its window picked: it is wrapped and the
/// wrapper is ordered in reverse.
#[must_use]
pub fn reverse(mut select: Select) -> Select {
    let Some(reversed) = select
        .bounds()
        .order
        .as_ref()
        .filter(|order| !order.is_empty())
        .map(Order::reversed)
    else {
        return select;
    };

    if select.is_bounded() {
        return select.sub().order_by(&reversed);
    }

    select.bounds_mut().order = Some(reversed);
    select
}

fn combine(op: SetOperation, left: Select, right: Select) -> Select {
    if left.is_bounded() || right.is_bounded() {
        record(MetricsEvent::FoldRejected { op: op.label() });
        return compose(op, left, right);
    }

    match try_fold(op, left, right) {
        Ok(folded) => {
            record(MetricsEvent::SelectFolded { op: op.label() });
            folded
        }
        Err((left, right)) => compose(op, left, right),
    }
}

fn compose(op: SetOperation, left: Select, right: Select) -> Select {
    Select::Binary(BinaryOperationSelect {
        op,
        left: Box::new(left),
        right: Box::new(right),
        bounds: SelectBounds::default(),
    })
}

// Both operands are unbounded here. Hands the operands back when no rule applies.
fn try_fold(op: SetOperation, left: Select, right: Select) -> Result<Select, (Select, Select)> {
    match (op, left, right) {
        (
            SetOperation::Intersect | SetOperation::Union { as_set: true },
            Select::RecordIds(left),
            Select::RecordIds(right),
        ) => Ok(Select::RecordIds(RecordIdSelect {
            ids: fold_ids(op, &left.ids, &right.ids),
            bounds: merge_bounds(left.bounds, right.bounds),
        })),

        (
            SetOperation::Intersect
            | SetOperation::Union { as_set: true }
            | SetOperation::Difference,
            Select::Class(left),
            Select::Class(right),
        ) if left.class == right.class => {
            match fold_conditions(op, left.condition.clone(), right.condition.clone()) {
                Some(condition) => Ok(Select::Class(ClassSelect {
                    class: left.class,
                    condition,
                    bounds: merge_bounds(left.bounds, right.bounds),
                })),
                None => Err((Select::Class(left), Select::Class(right))),
            }
        }

        (_, left, right) => Err((left, right)),
    }
}

fn fold_ids(op: SetOperation, left: &[EntityId], right: &[EntityId]) -> Vec<EntityId> {
    let mut seen = HashSet::new();

    match op {
        SetOperation::Intersect => {
            let keep: HashSet<&EntityId> = right.iter().collect();
            left.iter()
                .filter(|id| keep.contains(id) && seen.insert(**id))
                .copied()
                .collect()
        }
        _ => left
            .iter()
            .chain(right)
            .filter(|id| seen.insert(**id))
            .copied()
            .collect(),
    }
}

// Outer `None`: not foldable. Inner `None`: no condition (all of the class).
fn fold_conditions(
    op: SetOperation,
    left: Option<Condition>,
    right: Option<Condition>,
) -> Option<Option<Condition>> {
    match op {
        SetOperation::Intersect => Some(match (left, right) {
            (Some(left), Some(right)) => Some(Condition::and(left, right)),
            (Some(only), None) | (None, Some(only)) => Some(only),
            (None, None) => None,
        }),
        SetOperation::Union { .. } => Some(match (left, right) {
            (Some(left), Some(right)) => Some(Condition::or(left, right)),
            _ => None,
        }),
        SetOperation::Difference => match (left, right) {
            (Some(left), Some(right)) => Some(Some(Condition::and_not(left, right))),
            (None, Some(right)) => Some(Some(!right)),
            (_, None) => None,
        },
    }
}

// Operands are unbounded, so only their orders survive the fold.
fn merge_bounds(left: SelectBounds, right: SelectBounds) -> SelectBounds {
    let order = match (left.order, right.order) {
        (Some(left), Some(right)) => Some(left.merge(&right)),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    };

    SelectBounds {
        order: order.filter(|order: &Order| !order.is_empty()),
        skip: None,
        limit: None,
    }
}
