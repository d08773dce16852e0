use crate::{
    db::query::{condition::Condition, order::Order},
    id::EntityId,
};
use std::fmt::Write as _;

///
/// SelectBounds
///
/// Order and window decorators shared by every select shape.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelectBounds {
    pub order: Option<Order>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl SelectBounds {
    /// True when skip or limit is set. Order alone does not bound a select.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.skip.is_some() || self.limit.is_some()
    }

    #[must_use]
    pub fn has_order(&self) -> bool {
        self.order.as_ref().is_some_and(|order| !order.is_empty())
    }
}

///
/// ClassSelect
///

#[derive(Clone, Debug, PartialEq)]
pub struct ClassSelect {
    pub class: String,
    pub condition: Option<Condition>,
    pub bounds: SelectBounds,
}

///
/// RecordIdSelect
///
/// Select over a literal id list, bound as a single parameter.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RecordIdSelect {
    pub ids: Vec<EntityId>,
    pub bounds: SelectBounds,
}

///
/// LinkDirection
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkDirection {
    Out,
    In,
}

impl LinkDirection {
    #[must_use]
    pub const fn function(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::In => "in",
        }
    }
}

///
/// LinkSelect
///
/// Targets of `link` traversed from every entity of `source`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct LinkSelect {
    pub source: Box<Select>,
    pub link: String,
    pub direction: LinkDirection,
    pub bounds: SelectBounds,
}

///
/// SetOperation
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SetOperation {
    Intersect,
    Union { as_set: bool },
    Difference,
}

impl SetOperation {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Intersect => "intersect",
            Self::Union { as_set: true } => "union",
            Self::Union { as_set: false } => "union_all",
            Self::Difference => "difference",
        }
    }
}

///
/// BinaryOperationSelect
///
/// A set operation that could not be folded into one flat select.
/// Compiles to a `LET`-bound sub-query pair.
///

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryOperationSelect {
    pub op: SetOperation,
    pub left: Box<Select>,
    pub right: Box<Select>,
    pub bounds: SelectBounds,
}

///
/// DistinctSelect
///

#[derive(Clone, Debug, PartialEq)]
pub struct DistinctSelect {
    pub inner: Box<Select>,
    pub bounds: SelectBounds,
}

///
/// SubSelect
///
/// Orders or windows the rows of an already bounded select without
/// disturbing which rows that select picks.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SubSelect {
    pub inner: Box<Select>,
    pub bounds: SelectBounds,
}

///
/// Select
///
/// Closed set of select shapes the rewriter and compiler understand.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Select {
    Class(ClassSelect),
    RecordIds(RecordIdSelect),
    Links(LinkSelect),
    Binary(BinaryOperationSelect),
    Distinct(DistinctSelect),
    Sub(SubSelect),
}

impl Select {
    /// Every entity of `class`.
    #[must_use]
    pub fn all_of(class: impl Into<String>) -> Self {
        Self::Class(ClassSelect {
            class: class.into(),
            condition: None,
            bounds: SelectBounds::default(),
        })
    }

    /// Entities of `class` matching `condition`.
    #[must_use]
    pub fn find(class: impl Into<String>, condition: Condition) -> Self {
        Self::Class(ClassSelect {
            class: class.into(),
            condition: Some(condition),
            bounds: SelectBounds::default(),
        })
    }

    #[must_use]
    pub fn record_ids(ids: Vec<EntityId>) -> Self {
        Self::RecordIds(RecordIdSelect {
            ids,
            bounds: SelectBounds::default(),
        })
    }

    #[must_use]
    pub fn links(source: Self, link: impl Into<String>, direction: LinkDirection) -> Self {
        Self::Links(LinkSelect {
            source: Box::new(source),
            link: link.into(),
            direction,
            bounds: SelectBounds::default(),
        })
    }

    #[must_use]
    pub const fn bounds(&self) -> &SelectBounds {
        match self {
            Self::Class(select) => &select.bounds,
            Self::RecordIds(select) => &select.bounds,
            Self::Links(select) => &select.bounds,
            Self::Binary(select) => &select.bounds,
            Self::Distinct(select) => &select.bounds,
            Self::Sub(select) => &select.bounds,
        }
    }

    pub(crate) const fn bounds_mut(&mut self) -> &mut SelectBounds {
        match self {
            Self::Class(select) => &mut select.bounds,
            Self::RecordIds(select) => &mut select.bounds,
            Self::Links(select) => &mut select.bounds,
            Self::Binary(select) => &mut select.bounds,
            Self::Distinct(select) => &mut select.bounds,
            Self::Sub(select) => &mut select.bounds,
        }
    }

    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.bounds().is_bounded()
    }

    /// Wrap this select so further bounds apply to its result rows.
    #[must_use]
    pub fn sub(self) -> Self {
        Self::Sub(SubSelect {
            inner: Box::new(self),
            bounds: SelectBounds::default(),
        })
    }

    /// Merge `order` over the current order; the new keys take priority.
    ///
    /// Ordering applies after any existing window, so a bounded select is
    /// wrapped first and keeps the rows its window picked.
    #[must_use]
    pub fn order_by(mut self, order: &Order) -> Self {
        if self.is_bounded() {
            self = self.sub();
        }

        let bounds = self.bounds_mut();
        bounds.order = Some(match bounds.order.take() {
            Some(existing) => existing.merge(order),
            None => order.clone(),
        });
        self
    }

    /// Drop the first `count` results of this select.
    ///
    /// Applied after any existing window: an existing limit shrinks by `count`.
    #[must_use]
    pub fn skip(mut self, count: usize) -> Self {
        if count == 0 {
            return self;
        }

        let bounds = self.bounds_mut();
        bounds.skip = Some(bounds.skip.unwrap_or(0).saturating_add(count));
        bounds.limit = bounds.limit.map(|limit| limit.saturating_sub(count));
        self
    }

    /// Keep at most `count` results of this select.
    #[must_use]
    pub fn take(mut self, count: usize) -> Self {
        let bounds = self.bounds_mut();
        bounds.limit = Some(bounds.limit.map_or(count, |limit| limit.min(count)));
        self
    }

    /// Short operand description used in error details and debug output.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = match self {
            Self::Class(select) => match select.condition {
                Some(_) => format!("class {} (filtered)", select.class),
                None => format!("class {}", select.class),
            },
            Self::RecordIds(select) => format!("ids[{}]", select.ids.len()),
            Self::Links(select) => format!(
                "{}('{}') of {}",
                select.direction.function(),
                select.link,
                select.source.describe()
            ),
            Self::Binary(select) => format!(
                "{}({}, {})",
                select.op.label(),
                select.left.describe(),
                select.right.describe()
            ),
            Self::Distinct(select) => format!("distinct({})", select.inner.describe()),
            Self::Sub(select) => format!("({})", select.inner.describe()),
        };

        let bounds = self.bounds();
        if let Some(skip) = bounds.skip {
            let _ = write!(out, " skip {skip}");
        }
        if let Some(limit) = bounds.limit {
            let _ = write!(out, " limit {limit}");
        }

        out
    }
}
