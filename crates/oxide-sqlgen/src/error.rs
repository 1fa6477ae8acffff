//! Error taxonomy.
//!
//! Every failure surfaced by the compiler, the migration engine, or a driver
//! is classified into one of the classes below. Driver errors are mapped
//! onto the taxonomy by [`crate::error_map`].

use std::fmt;

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The database could not be reached or refused the session.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A statement failed, either while compiling or while executing.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// An input value broke a field rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A schema reference could not be resolved.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A malformed abstract query node.
    #[error(transparent)]
    Ast(#[from] AstError),

    /// The dialect cannot express the requested feature.
    #[error(transparent)]
    FeatureNotSupported(#[from] FeatureNotSupported),
}

/// Result type alias for compiler and migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionErrorKind {
    Timeout,
    AuthenticationFailed,
    HostUnreachable,
    PoolExhausted,
    SslRequired,
    Other,
}

impl ConnectionErrorKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "connection timed out",
            Self::AuthenticationFailed => "authentication failed",
            Self::HostUnreachable => "host unreachable",
            Self::PoolExhausted => "connection pool exhausted",
            Self::SslRequired => "SSL required",
            Self::Other => "connection error",
        }
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection-class failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ConnectionError {
    /// What went wrong.
    pub kind: ConnectionErrorKind,
    /// Native error code, if the driver reported one.
    pub code: Option<String>,
    /// Driver message.
    pub message: String,
}

impl ConnectionError {
    /// Creates a connection error without a native code.
    #[must_use]
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }
}

/// Kinds of query failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    Syntax,
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,
    Timeout,
    TableNotFound,
    ColumnNotFound,
    Deadlock,
    SerializationFailure,
    LockTimeout,
    /// An operator name that is not in the registry.
    UnknownOperator,
    /// A value of the wrong shape for an operator or clause.
    InvalidArgument,
    Other,
}

impl QueryErrorKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax error",
            Self::UniqueViolation => "unique constraint violation",
            Self::ForeignKeyViolation => "foreign key violation",
            Self::NotNullViolation => "not-null violation",
            Self::CheckViolation => "check constraint violation",
            Self::Timeout => "query timed out",
            Self::TableNotFound => "table not found",
            Self::ColumnNotFound => "column not found",
            Self::Deadlock => "deadlock detected",
            Self::SerializationFailure => "serialization failure",
            Self::LockTimeout => "lock wait timeout",
            Self::UnknownOperator => "unknown operator",
            Self::InvalidArgument => "invalid argument",
            Self::Other => "query error",
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query-class failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct QueryError {
    /// What went wrong.
    pub kind: QueryErrorKind,
    /// Native error code, if the driver reported one.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl QueryError {
    /// Creates a query error without a native code.
    #[must_use]
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }
}

/// Rule a validation error was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationRule {
    Required,
    Type,
    Constraint,
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Required => "required",
            Self::Type => "type",
            Self::Constraint => "constraint",
        })
    }
}

/// A field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed on `{field}` ({rule}): {message}")]
pub struct ValidationError {
    pub field: String,
    pub rule: ValidationRule,
    pub message: String,
}

/// Kinds of schema failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaErrorKind {
    ModelNotFound,
    FieldNotFound,
    RelationNotFound,
    CircularDependency,
    InvalidRelation,
}

impl fmt::Display for SchemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ModelNotFound => "model not found",
            Self::FieldNotFound => "field not found",
            Self::RelationNotFound => "relation not found",
            Self::CircularDependency => "circular dependency",
            Self::InvalidRelation => "invalid relation",
        })
    }
}

/// A schema-class failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

/// A malformed abstract query node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {node}: {message}")]
pub struct AstError {
    /// Node kind, e.g. `select item` or `join`.
    pub node: String,
    pub message: String,
}

/// A feature the dialect cannot express.
///
/// Fatal to the query and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{feature} is not supported by {dialect} (`{method}`): {suggestion}")]
pub struct FeatureNotSupported {
    pub dialect: String,
    pub feature: String,
    pub method: String,
    pub suggestion: String,
}

impl Error {
    /// Shorthand for an [`QueryErrorKind::UnknownOperator`] error.
    #[must_use]
    pub fn unknown_operator(name: &str) -> Self {
        QueryError::new(
            QueryErrorKind::UnknownOperator,
            format!("operator `{name}` is not registered"),
        )
        .into()
    }

    /// Shorthand for an [`QueryErrorKind::InvalidArgument`] error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        QueryError::new(QueryErrorKind::InvalidArgument, message).into()
    }

    /// Shorthand for an [`AstError`].
    #[must_use]
    pub fn ast(node: impl Into<String>, message: impl Into<String>) -> Self {
        AstError {
            node: node.into(),
            message: message.into(),
        }
        .into()
    }

    /// Shorthand for a [`SchemaError`].
    #[must_use]
    pub fn schema(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        SchemaError {
            kind,
            message: message.into(),
        }
        .into()
    }

    /// Shorthand for a [`FeatureNotSupported`] error.
    #[must_use]
    pub fn not_supported(
        dialect: &str,
        feature: &str,
        method: &str,
        suggestion: impl Into<String>,
    ) -> Self {
        FeatureNotSupported {
            dialect: String::from(dialect),
            feature: String::from(feature),
            method: String::from(method),
            suggestion: suggestion.into(),
        }
        .into()
    }

    /// Returns the query error kind, if this is a query-class error.
    #[must_use]
    pub const fn query_kind(&self) -> Option<QueryErrorKind> {
        match self {
            Self::Query(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Returns `true` if retrying the same statement may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        is_retryable_error(self)
    }
}

/// Returns `true` for deadlocks, serialization failures and lock timeouts.
///
/// The library never retries on its own; callers decide.
#[must_use]
pub const fn is_retryable_error(error: &Error) -> bool {
    matches!(
        error,
        Error::Query(QueryError {
            kind: QueryErrorKind::Deadlock
                | QueryErrorKind::SerializationFailure
                | QueryErrorKind::LockTimeout,
            ..
        })
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        let deadlock: Error = QueryError::new(QueryErrorKind::Deadlock, "x").into();
        let serialization: Error =
            QueryError::new(QueryErrorKind::SerializationFailure, "x").into();
        let unique: Error = QueryError::new(QueryErrorKind::UniqueViolation, "x").into();
        assert!(is_retryable_error(&deadlock));
        assert!(serialization.is_retryable());
        assert!(!unique.is_retryable());
        let err = Error::not_supported("sqlite", "vector", "distance", "use postgres");
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_messages() {
        let err = Error::unknown_operator("regex");
        assert_eq!(
            err.to_string(),
            "unknown operator: operator `regex` is not registered"
        );
        let err = Error::not_supported(
            "sqlite",
            "vector search",
            "distance",
            "use PostgreSQL with pgvector",
        );
        assert_eq!(
            err.to_string(),
            "vector search is not supported by sqlite (`distance`): use PostgreSQL with pgvector"
        );
    }

    #[test]
    fn query_kind_per_variant() {
        assert_eq!(
            Error::invalid_argument("bad").query_kind(),
            Some(QueryErrorKind::InvalidArgument)
        );
        assert_eq!(Error::ast("join", "no table").query_kind(), None);
    }
}
