//! Module: iterable::node
//! Responsibility: immutable combinator tree, structural sortedness, and the
//! per-node choice of local evaluation strategy.
//! Does not own: stream state machines (`executor::stream`) or select
//! rewriting (`query::algebra`).

use crate::{
    db::{
        direction::Direction,
        executor::{
            EvalContext,
            stream::{
                AdjacentDistinctStream, BoxedIdIterator, BudgetedIdStream, ConcatStream,
                EmptyIdIterator, HashIntersectStream, HashMinusStream, IdOrderComparator, IdSlot,
                IdSetSource, MaterializeMode, MaterializedStream, MergeIntersectStream,
                MergeMinusStream, MergeUnionStream, ProbeSet, Pulled, SkipIdStream,
            },
        },
        iterable::{explain::ExplainNode, leaf::PrimitiveIterable},
        query::{Order, Select, algebra},
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
};
use std::{collections::HashSet, rc::Rc};

///
/// Operator
///
/// Node kind tag, used for dispatch labels, metrics and explain output.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    Leaf,
    Union,
    Intersection,
    Minus,
    Concat,
    Distinct,
    Sort,
    Reverse,
    Skip,
    Take,
}

impl Operator {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Minus => "minus",
            Self::Concat => "concat",
            Self::Distinct => "distinct",
            Self::Sort => "sort",
            Self::Reverse => "reverse",
            Self::Skip => "skip",
            Self::Take => "take",
        }
    }
}

///
/// ProbeSide
///
/// Which child of a binary node is hashed; the other one is streamed.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeSide {
    Left,
    Right,
}

///
/// Strategy
///
/// Local evaluation plan chosen for one node from structure alone.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    Scan,
    Empty,
    Merge,
    MaterializeMerge,
    HashProbe { build: ProbeSide },
    PassThrough,
    Concat,
    AdjacentDistinct,
    HashDistinct,
    MaterializeSort,
    Reverse,
    Skip,
    Take,
}

impl Strategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Empty => "empty",
            Self::Merge => "merge",
            Self::MaterializeMerge => "materialize_merge",
            Self::HashProbe {
                build: ProbeSide::Left,
            } => "hash_probe(left)",
            Self::HashProbe {
                build: ProbeSide::Right,
            } => "hash_probe(right)",
            Self::PassThrough => "pass_through",
            Self::Concat => "concat",
            Self::AdjacentDistinct => "adjacent_distinct",
            Self::HashDistinct => "hash_distinct",
            Self::MaterializeSort => "materialize_sort",
            Self::Reverse => "reverse",
            Self::Skip => "skip",
            Self::Take => "take",
        }
    }
}

#[derive(Clone)]
enum NodeKind {
    Leaf(Rc<dyn PrimitiveIterable>),
    Union(Rc<IterableNode>, Rc<IterableNode>),
    Intersection {
        left: Rc<IterableNode>,
        right: Rc<IterableNode>,
        preserve_right_order: bool,
    },
    Minus(Rc<IterableNode>, Rc<IterableNode>),
    Concat(Rc<IterableNode>, Rc<IterableNode>),
    Distinct(Rc<IterableNode>),
    Sort(Rc<IterableNode>),
    Reverse(Rc<IterableNode>),
    Skip(Rc<IterableNode>, usize),
    Take(Rc<IterableNode>, usize),
}

///
/// IterableNode
///
/// One node of an immutable combinator tree. Composing always yields a new
/// node; children are shared, never mutated.
///
/// `sorted_by_id` is fixed at construction from the children's flags and the
/// operator, never from data:
///
/// - union, distinct, sort: always sorted
/// - intersection: sorted, or the right child's flag when right order is preserved
/// - minus: the minuend's flag
/// - concat, reverse: never sorted
/// - skip, take: the child's flag
///

#[derive(Clone)]
pub struct IterableNode {
    kind: NodeKind,
    sorted_by_id: bool,
}

impl IterableNode {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    #[must_use]
    pub fn leaf(leaf: impl PrimitiveIterable + 'static) -> Self {
        let sorted_by_id = leaf.is_sorted_by_id();

        Self {
            kind: NodeKind::Leaf(Rc::new(leaf)),
            sorted_by_id,
        }
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            kind: NodeKind::Union(Rc::new(self), Rc::new(other)),
            sorted_by_id: true,
        }
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self {
            kind: NodeKind::Intersection {
                left: Rc::new(self),
                right: Rc::new(other),
                preserve_right_order: false,
            },
            sorted_by_id: true,
        }
    }

    /// Intersection that emits in `other`'s order.
    #[must_use]
    pub fn intersect_preserving_right_order(self, other: Self) -> Self {
        let sorted_by_id = other.sorted_by_id;

        Self {
            kind: NodeKind::Intersection {
                left: Rc::new(self),
                right: Rc::new(other),
                preserve_right_order: true,
            },
            sorted_by_id,
        }
    }

    #[must_use]
    pub fn minus(self, subtrahend: Self) -> Self {
        let sorted_by_id = self.sorted_by_id;

        Self {
            kind: NodeKind::Minus(Rc::new(self), Rc::new(subtrahend)),
            sorted_by_id,
        }
    }

    #[must_use]
    pub fn concat(self, other: Self) -> Self {
        Self {
            kind: NodeKind::Concat(Rc::new(self), Rc::new(other)),
            sorted_by_id: false,
        }
    }

    #[must_use]
    pub fn distinct(self) -> Self {
        Self {
            kind: NodeKind::Distinct(Rc::new(self)),
            sorted_by_id: true,
        }
    }

    #[must_use]
    pub fn sort(self) -> Self {
        Self {
            kind: NodeKind::Sort(Rc::new(self)),
            sorted_by_id: true,
        }
    }

    #[must_use]
    pub fn reverse(self) -> Self {
        Self {
            kind: NodeKind::Reverse(Rc::new(self)),
            sorted_by_id: false,
        }
    }

    #[must_use]
    pub fn skip(self, count: usize) -> Self {
        let sorted_by_id = self.sorted_by_id;

        Self {
            kind: NodeKind::Skip(Rc::new(self), count),
            sorted_by_id,
        }
    }

    #[must_use]
    pub fn take(self, count: usize) -> Self {
        let sorted_by_id = self.sorted_by_id;

        Self {
            kind: NodeKind::Take(Rc::new(self), count),
            sorted_by_id,
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn is_sorted_by_id(&self) -> bool {
        self.sorted_by_id
    }

    #[must_use]
    pub const fn operator(&self) -> Operator {
        match self.kind {
            NodeKind::Leaf(_) => Operator::Leaf,
            NodeKind::Union(..) => Operator::Union,
            NodeKind::Intersection { .. } => Operator::Intersection,
            NodeKind::Minus(..) => Operator::Minus,
            NodeKind::Concat(..) => Operator::Concat,
            NodeKind::Distinct(_) => Operator::Distinct,
            NodeKind::Sort(_) => Operator::Sort,
            NodeKind::Reverse(_) => Operator::Reverse,
            NodeKind::Skip(..) => Operator::Skip,
            NodeKind::Take(..) => Operator::Take,
        }
    }

    fn children(&self) -> Vec<&Self> {
        match &self.kind {
            NodeKind::Leaf(_) => Vec::new(),
            NodeKind::Union(left, right)
            | NodeKind::Intersection { left, right, .. }
            | NodeKind::Minus(left, right)
            | NodeKind::Concat(left, right) => vec![left.as_ref(), right.as_ref()],
            NodeKind::Distinct(child)
            | NodeKind::Sort(child)
            | NodeKind::Reverse(child)
            | NodeKind::Skip(child, _)
            | NodeKind::Take(child, _) => vec![child.as_ref()],
        }
    }

    /// Exact emitted count when known without iterating.
    #[must_use]
    pub fn count_hint(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Leaf(leaf) => leaf.count_hint(),
            NodeKind::Union(left, right) => {
                (left.is_known_empty() && right.is_known_empty()).then_some(0)
            }
            NodeKind::Intersection { left, right, .. } => {
                (left.is_known_empty() || right.is_known_empty()).then_some(0)
            }
            NodeKind::Minus(minuend, subtrahend) => {
                if subtrahend.is_known_empty() {
                    minuend.count_hint()
                } else {
                    minuend.is_known_empty().then_some(0)
                }
            }
            NodeKind::Concat(left, right) => left
                .count_hint()
                .zip(right.count_hint())
                .map(|(a, b)| a.saturating_add(b)),
            NodeKind::Distinct(child) => child.is_known_empty().then_some(0),
            NodeKind::Sort(child) | NodeKind::Reverse(child) => child.count_hint(),
            NodeKind::Skip(child, count) => child
                .count_hint()
                .map(|total| total.saturating_sub(*count)),
            NodeKind::Take(child, count) => match child.count_hint() {
                Some(total) => Some(total.min(*count)),
                None => (*count == 0).then_some(0),
            },
        }
    }

    fn is_known_empty(&self) -> bool {
        self.count_hint() == Some(0)
    }

    /// Local evaluation strategy, decided from structure and count hints only.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match &self.kind {
            NodeKind::Leaf(_) => Strategy::Scan,
            NodeKind::Union(left, right) => {
                if left.sorted_by_id && right.sorted_by_id {
                    Strategy::Merge
                } else {
                    Strategy::MaterializeMerge
                }
            }
            NodeKind::Intersection {
                left,
                right,
                preserve_right_order,
            } => {
                if left.is_known_empty() || right.is_known_empty() {
                    Strategy::Empty
                } else if *preserve_right_order {
                    Strategy::HashProbe {
                        build: ProbeSide::Left,
                    }
                } else if left.sorted_by_id == right.sorted_by_id {
                    if left.sorted_by_id {
                        Strategy::Merge
                    } else {
                        Strategy::MaterializeMerge
                    }
                } else if left.sorted_by_id {
                    Strategy::HashProbe {
                        build: ProbeSide::Right,
                    }
                } else {
                    Strategy::HashProbe {
                        build: ProbeSide::Left,
                    }
                }
            }
            NodeKind::Minus(minuend, subtrahend) => {
                if minuend.is_known_empty() {
                    Strategy::Empty
                } else if subtrahend.is_known_empty() {
                    Strategy::PassThrough
                } else if minuend.sorted_by_id && subtrahend.sorted_by_id {
                    Strategy::Merge
                } else {
                    Strategy::HashProbe {
                        build: ProbeSide::Right,
                    }
                }
            }
            NodeKind::Concat(..) => Strategy::Concat,
            NodeKind::Distinct(child) => {
                if child.sorted_by_id {
                    Strategy::AdjacentDistinct
                } else {
                    Strategy::HashDistinct
                }
            }
            NodeKind::Sort(child) => {
                if child.sorted_by_id {
                    Strategy::PassThrough
                } else {
                    Strategy::MaterializeSort
                }
            }
            NodeKind::Reverse(_) => Strategy::Reverse,
            NodeKind::Skip(..) => Strategy::Skip,
            NodeKind::Take(..) => Strategy::Take,
        }
    }

    /// Strategy tree for this node and all descendants.
    #[must_use]
    pub fn explain(&self) -> ExplainNode {
        ExplainNode {
            operator: self.operator(),
            strategy: self.strategy(),
            sorted_by_id: self.sorted_by_id,
            detail: match &self.kind {
                NodeKind::Leaf(leaf) => Some(leaf.describe()),
                NodeKind::Skip(_, count) | NodeKind::Take(_, count) => Some(count.to_string()),
                _ => None,
            },
            children: self.children().into_iter().map(Self::explain).collect(),
        }
    }

    // ------------------------------------------------------------------
    // Local evaluation
    // ------------------------------------------------------------------

    /// Open a lazy forward iterator. Nothing is pulled until the caller pulls.
    pub fn iterator(&self, ctx: EvalContext) -> Result<BoxedIdIterator, InternalError> {
        let op = self.operator().label();
        let strategy = self.strategy();
        record(MetricsEvent::IteratorOpened { op });
        ctx.debug_log(format!("{op}: open iterator ({})", strategy.label()));

        let asc = IdOrderComparator::from_direction(Direction::Asc);

        match (&self.kind, strategy) {
            (NodeKind::Leaf(leaf), _) => leaf.iterator(),
            (_, Strategy::Empty) => Ok(EmptyIdIterator::boxed()),

            (NodeKind::Union(left, right), Strategy::Merge) => Ok(Pulled::boxed(
                MergeUnionStream::new(left.lane(ctx)?, right.lane(ctx)?, asc),
            )),
            (NodeKind::Union(left, right), _) => Ok(Pulled::boxed(MergeUnionStream::new(
                left.sorted_lane(Direction::Asc, op, ctx)?,
                right.sorted_lane(Direction::Asc, op, ctx)?,
                asc,
            ))),

            (NodeKind::Intersection { left, right, .. }, Strategy::Merge) => Ok(Pulled::boxed(
                MergeIntersectStream::new(left.iterator(ctx)?, right.iterator(ctx)?, asc),
            )),
            (NodeKind::Intersection { left, right, .. }, Strategy::MaterializeMerge) => {
                Ok(Pulled::boxed(MergeIntersectStream::new(
                    left.sorted_lane(Direction::Asc, op, ctx)?,
                    right.sorted_lane(Direction::Asc, op, ctx)?,
                    asc,
                )))
            }
            (NodeKind::Intersection { left, right, .. }, Strategy::HashProbe { build }) => {
                let (built, streamed) = match build {
                    ProbeSide::Left => (left, right),
                    ProbeSide::Right => (right, left),
                };
                Ok(Pulled::boxed(HashIntersectStream::new(
                    ProbeSet::new(Self::id_set_source(built, ctx)),
                    streamed.iterator(ctx)?,
                    ctx,
                )))
            }

            (NodeKind::Minus(minuend, _), Strategy::PassThrough) => minuend.iterator(ctx),
            (NodeKind::Minus(minuend, subtrahend), Strategy::Merge) => Ok(Pulled::boxed(
                MergeMinusStream::new(minuend.iterator(ctx)?, subtrahend.iterator(ctx)?, asc),
            )),
            (NodeKind::Minus(minuend, subtrahend), _) => Ok(Pulled::boxed(HashMinusStream::new(
                minuend.iterator(ctx)?,
                ProbeSet::new(Self::id_set_source(subtrahend, ctx)),
                ctx,
            ))),

            (NodeKind::Concat(left, right), _) => {
                if left.is_known_empty() {
                    right.iterator(ctx)
                } else if right.is_known_empty() {
                    left.iterator(ctx)
                } else {
                    Ok(Pulled::boxed(ConcatStream::new(
                        left.iterator(ctx)?,
                        right.iterator(ctx)?,
                    )))
                }
            }

            (NodeKind::Distinct(child), Strategy::AdjacentDistinct) => Ok(Pulled::boxed(
                AdjacentDistinctStream::new(child.iterator(ctx)?),
            )),
            (NodeKind::Distinct(child), _) => Ok(Pulled::boxed(MaterializedStream::new(
                child.iterator(ctx)?,
                MaterializeMode::SortDistinct(Direction::Asc),
                op,
                ctx,
            ))),

            (NodeKind::Sort(child), Strategy::PassThrough) => child.iterator(ctx),
            (NodeKind::Sort(child), _) => child.sorted_lane(Direction::Asc, op, ctx),

            (NodeKind::Reverse(child), _) => child.reverse_iterator(ctx),

            (NodeKind::Skip(child, count), _) => Ok(Pulled::boxed(SkipIdStream::new(
                child.iterator(ctx)?,
                *count,
            ))),
            (NodeKind::Take(child, count), _) => Ok(Pulled::boxed(BudgetedIdStream::new(
                child.iterator(ctx)?,
                *count,
            ))),

            (NodeKind::Intersection { .. }, _) => Err(InternalError::executor_invariant(format!(
                "{op}: strategy {} has no iterator",
                strategy.label()
            ))),
        }
    }

    /// Open an iterator over the exact reverse of `iterator()`'s sequence.
    ///
    /// Sorted merges rerun under a descending comparator over the children's
    /// reverse iterators; hash and window shapes materialize and reverse.
    pub fn reverse_iterator(&self, ctx: EvalContext) -> Result<BoxedIdIterator, InternalError> {
        let op = self.operator().label();
        let strategy = self.strategy();
        record(MetricsEvent::IteratorOpened { op });
        ctx.debug_log(format!("{op}: open reverse iterator ({})", strategy.label()));

        let desc = IdOrderComparator::from_direction(Direction::Desc);

        match (&self.kind, strategy) {
            (NodeKind::Leaf(leaf), _) => leaf.reverse_iterator(),
            (_, Strategy::Empty) => Ok(EmptyIdIterator::boxed()),

            (NodeKind::Union(left, right), Strategy::Merge) => {
                Ok(Pulled::boxed(MergeUnionStream::new(
                    left.reverse_lane(ctx)?,
                    right.reverse_lane(ctx)?,
                    desc,
                )))
            }
            (NodeKind::Union(left, right), _) => Ok(Pulled::boxed(MergeUnionStream::new(
                left.sorted_lane(Direction::Desc, op, ctx)?,
                right.sorted_lane(Direction::Desc, op, ctx)?,
                desc,
            ))),

            (NodeKind::Intersection { left, right, .. }, Strategy::Merge) => {
                Ok(Pulled::boxed(MergeIntersectStream::new(
                    left.reverse_iterator(ctx)?,
                    right.reverse_iterator(ctx)?,
                    desc,
                )))
            }
            (NodeKind::Intersection { left, right, .. }, Strategy::MaterializeMerge) => {
                Ok(Pulled::boxed(MergeIntersectStream::new(
                    left.sorted_lane(Direction::Desc, op, ctx)?,
                    right.sorted_lane(Direction::Desc, op, ctx)?,
                    desc,
                )))
            }

            (NodeKind::Minus(minuend, _), Strategy::PassThrough) => minuend.reverse_iterator(ctx),
            (NodeKind::Minus(minuend, subtrahend), Strategy::Merge) => {
                Ok(Pulled::boxed(MergeMinusStream::new(
                    minuend.reverse_iterator(ctx)?,
                    subtrahend.reverse_iterator(ctx)?,
                    desc,
                )))
            }

            (NodeKind::Concat(left, right), _) => Ok(Pulled::boxed(ConcatStream::new(
                right.reverse_iterator(ctx)?,
                left.reverse_iterator(ctx)?,
            ))),

            (NodeKind::Distinct(child), Strategy::AdjacentDistinct) => Ok(Pulled::boxed(
                AdjacentDistinctStream::new(child.reverse_iterator(ctx)?),
            )),
            (NodeKind::Distinct(child), _) => Ok(Pulled::boxed(MaterializedStream::new(
                child.iterator(ctx)?,
                MaterializeMode::SortDistinct(Direction::Desc),
                op,
                ctx,
            ))),

            (NodeKind::Sort(child), Strategy::PassThrough) => child.reverse_iterator(ctx),
            (NodeKind::Sort(child), _) => child.sorted_lane(Direction::Desc, op, ctx),

            (NodeKind::Reverse(child), _) => child.iterator(ctx),

            // Hash probes and windows: order depends on the whole forward pass.
            (
                NodeKind::Intersection { .. }
                | NodeKind::Minus(..)
                | NodeKind::Skip(..)
                | NodeKind::Take(..),
                _,
            ) => Ok(Pulled::boxed(MaterializedStream::new(
                self.iterator(ctx)?,
                MaterializeMode::Reverse,
                op,
                ctx,
            ))),
        }
    }

    // Union lane: a known-empty side is never opened.
    fn lane(&self, ctx: EvalContext) -> Result<BoxedIdIterator, InternalError> {
        if self.is_known_empty() {
            Ok(EmptyIdIterator::boxed())
        } else {
            self.iterator(ctx)
        }
    }

    fn reverse_lane(&self, ctx: EvalContext) -> Result<BoxedIdIterator, InternalError> {
        if self.is_known_empty() {
            Ok(EmptyIdIterator::boxed())
        } else {
            self.reverse_iterator(ctx)
        }
    }

    // Lane ordered by id in `direction`, materializing only unsorted children.
    fn sorted_lane(
        &self,
        direction: Direction,
        op: &'static str,
        ctx: EvalContext,
    ) -> Result<BoxedIdIterator, InternalError> {
        if self.is_known_empty() {
            return Ok(EmptyIdIterator::boxed());
        }

        if self.sorted_by_id {
            return match direction {
                Direction::Asc => self.iterator(ctx),
                Direction::Desc => self.reverse_iterator(ctx),
            };
        }

        Ok(Pulled::boxed(MaterializedStream::new(
            self.iterator(ctx)?,
            MaterializeMode::Sort(direction),
            op,
            ctx,
        )))
    }

    fn id_set_source(node: &Rc<Self>, ctx: EvalContext) -> IdSetSource {
        let node = Rc::clone(node);

        Box::new(move || node.to_id_set(ctx))
    }

    /// Count emitted ids, iterating only when no exact hint is available.
    pub fn size(&self, ctx: EvalContext) -> Result<usize, InternalError> {
        if let Some(count) = self.count_hint() {
            return Ok(count);
        }

        let mut iter = self.iterator(ctx)?;
        if let Some(count) = iter.exact_count_hint() {
            return Ok(count);
        }

        let mut count = 0usize;
        while iter.has_next()? {
            iter.next_id()?;
            count = count.saturating_add(1);
        }

        Ok(count)
    }

    /// Distinct ids this node emits.
    pub fn to_id_set(&self, ctx: EvalContext) -> Result<HashSet<IdSlot>, InternalError> {
        if let NodeKind::Leaf(leaf) = &self.kind {
            return leaf.to_id_set();
        }

        let mut iter = self.iterator(ctx)?;
        let mut set = HashSet::new();
        while iter.has_next()? {
            set.insert(iter.next_id()?);
        }

        Ok(set)
    }

    // ------------------------------------------------------------------
    // Remote evaluation
    // ------------------------------------------------------------------

    /// Build the select AST for this tree, folding at each binary step.
    pub fn to_select(&self, ctx: EvalContext) -> Result<Select, InternalError> {
        Ok(match &self.kind {
            NodeKind::Leaf(leaf) => leaf.select()?,
            NodeKind::Union(left, right) => algebra::union_with(
                left.to_select(ctx)?,
                right.to_select(ctx)?,
                ctx.distinct_union_as_set(),
            ),
            NodeKind::Intersection { left, right, .. } => {
                algebra::intersect(left.to_select(ctx)?, right.to_select(ctx)?)
            }
            NodeKind::Minus(minuend, subtrahend) => {
                algebra::difference(minuend.to_select(ctx)?, subtrahend.to_select(ctx)?)
            }
            NodeKind::Concat(left, right) => {
                algebra::union_all(left.to_select(ctx)?, right.to_select(ctx)?)
            }
            NodeKind::Distinct(child) => algebra::distinct(child.to_select(ctx)?),
            NodeKind::Sort(child) => child.to_select(ctx)?.order_by(&Order::asc("@rid")),
            NodeKind::Reverse(child) => algebra::reverse(child.to_select(ctx)?),
            NodeKind::Skip(child, count) => child.to_select(ctx)?.skip(*count),
            NodeKind::Take(child, count) => child.to_select(ctx)?.take(*count),
        })
    }
}
