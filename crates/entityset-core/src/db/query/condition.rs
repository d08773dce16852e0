use crate::value::Value;
use std::ops::{BitAnd, BitOr, Not};

///
/// Condition
///
/// Structural predicate tree attached to class selects.
/// Nothing here evaluates against an entity; conditions only render to query
/// text through the compiler, with every literal bound as a parameter.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Equals { field: String, value: Value },
    Contains { field: String, value: String },
    StartsWith { field: String, prefix: String },
    IsNull { field: String },
    IsNotNull { field: String },
    EdgeExists { link: String },
    Range { field: String, from: Value, to: Value },
    InstanceOf { class: String },
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Not(Box<Self>),
    AndNot(Box<Self>, Box<Self>),
}

impl Condition {
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::StartsWith {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::IsNotNull {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn edge_exists(link: impl Into<String>) -> Self {
        Self::EdgeExists { link: link.into() }
    }

    #[must_use]
    pub fn range(field: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::Range {
            field: field.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub fn instance_of(class: impl Into<String>) -> Self {
        Self::InstanceOf {
            class: class.into(),
        }
    }

    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn and_not(left: Self, right: Self) -> Self {
        Self::AndNot(Box::new(left), Box::new(right))
    }
}

impl BitAnd for Condition {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::and(self, rhs)
    }
}

impl BitOr for Condition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::or(self, rhs)
    }
}

impl Not for Condition {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}
