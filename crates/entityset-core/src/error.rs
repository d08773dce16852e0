use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Carries the offending operator/operand through `detail` when the failure
/// came from query composition or backend capability checks.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct a backend-origin internal error.
    pub fn backend_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Backend, message.into())
    }

    /// Construct a config-origin internal error.
    pub(crate) fn config_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Config, message.into())
    }

    /// Construct an error from a query-composition failure.
    pub(crate) fn from_query_error(origin: ErrorOrigin, err: QueryError) -> Self {
        let class = match &err {
            QueryError::BoundedSubquery { .. } => ErrorClass::InvalidComposition,
            QueryError::UnsupportedOperation { .. } => ErrorClass::Unsupported,
            QueryError::InvalidIdentifier { .. } => ErrorClass::InvalidComposition,
        };

        Self {
            class,
            origin,
            message: err.to_string(),
            detail: Some(ErrorDetail::Query(err)),
        }
    }

    /// Construct the deferred "bounded operand inside a set operation" error.
    pub(crate) fn bounded_subquery(
        operator: &'static str,
        operand: impl Into<String>,
    ) -> Self {
        Self::from_query_error(
            ErrorOrigin::Compile,
            QueryError::BoundedSubquery {
                operator,
                operand: operand.into(),
            },
        )
    }

    /// Construct an unsupported-operation error for a leaf that lacks a capability.
    pub fn unsupported_operation(
        origin: ErrorOrigin,
        operator: &'static str,
        operand: impl Into<String>,
    ) -> Self {
        Self::from_query_error(
            origin,
            QueryError::UnsupportedOperation {
                operator,
                operand: operand.into(),
            },
        )
    }

    /// Construct an invalid identifier error raised while rendering query text.
    pub(crate) fn invalid_identifier(kind: &'static str, name: impl Into<String>) -> Self {
        Self::from_query_error(
            ErrorOrigin::Compile,
            QueryError::InvalidIdentifier {
                kind,
                name: name.into(),
            },
        )
    }

    /// Programming errors (missing capabilities, broken invariants) are not retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.class,
            ErrorClass::Unsupported | ErrorClass::InvariantViolation
        )
    }

    #[must_use]
    pub const fn is_bounded_subquery(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Query(QueryError::BoundedSubquery { .. }))
        )
    }

    #[must_use]
    pub const fn query_error(&self) -> Option<&QueryError> {
        match &self.detail {
            Some(ErrorDetail::Query(err)) => Some(err),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Clone, Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Query(QueryError),
}

///
/// QueryError
///
/// Composition failures surfaced while folding or compiling selects,
/// or while asking a leaf for a capability it does not provide.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QueryError {
    #[error("skip/limit cannot be used for a sub-query: {operator} operand {operand}")]
    BoundedSubquery {
        operator: &'static str,
        operand: String,
    },

    #[error("unsupported operation '{operator}' for {operand}")]
    UnsupportedOperation {
        operator: &'static str,
        operand: String,
    },

    #[error("invalid {kind} identifier '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Internal,
    Unsupported,
    InvariantViolation,
    InvalidComposition,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::InvalidComposition => "invalid_composition",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Iterable,
    Executor,
    Compile,
    Backend,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Iterable => "iterable",
            Self::Executor => "executor",
            Self::Compile => "compile",
            Self::Backend => "backend",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_subquery_error_carries_operator_and_operand() {
        let err = InternalError::bounded_subquery("intersect", "SELECT FROM Issue SKIP 1 LIMIT 1");

        assert_eq!(err.class, ErrorClass::InvalidComposition);
        assert_eq!(err.origin, ErrorOrigin::Compile);
        assert!(err.is_bounded_subquery());
        assert!(err.message.contains("skip/limit cannot be used for a sub-query"));
        assert_eq!(
            err.query_error(),
            Some(&QueryError::BoundedSubquery {
                operator: "intersect",
                operand: "SELECT FROM Issue SKIP 1 LIMIT 1".to_string(),
            })
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn unsupported_operation_is_fatal() {
        let err = InternalError::unsupported_operation(ErrorOrigin::Iterable, "links", "ids[3]");

        assert_eq!(err.class, ErrorClass::Unsupported);
        assert!(err.is_fatal());
        assert_eq!(
            err.display_with_class(),
            "iterable:unsupported: unsupported operation 'links' for ids[3]"
        );
    }
}
