//! Native error codes mapped onto the error taxonomy.
//!
//! Each dialect has a code table. Codes the table does not know fall back
//! to a few message patterns, then to [`QueryErrorKind::Other`]. The native
//! code is always kept on the mapped error.

use crate::dialect::DialectKind;
use crate::error::{ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Query(QueryErrorKind),
    Connection(ConnectionErrorKind),
}

use Class::{Connection as C, Query as Q};

const POSTGRES: &[(&str, Class)] = &[
    ("23505", Q(QueryErrorKind::UniqueViolation)),
    ("23503", Q(QueryErrorKind::ForeignKeyViolation)),
    ("23502", Q(QueryErrorKind::NotNullViolation)),
    ("23514", Q(QueryErrorKind::CheckViolation)),
    ("42601", Q(QueryErrorKind::Syntax)),
    ("42P01", Q(QueryErrorKind::TableNotFound)),
    ("42703", Q(QueryErrorKind::ColumnNotFound)),
    ("40P01", Q(QueryErrorKind::Deadlock)),
    ("40001", Q(QueryErrorKind::SerializationFailure)),
    ("55P03", Q(QueryErrorKind::LockTimeout)),
    ("57014", Q(QueryErrorKind::Timeout)),
    ("28P01", C(ConnectionErrorKind::AuthenticationFailed)),
    ("28000", C(ConnectionErrorKind::AuthenticationFailed)),
    ("53300", C(ConnectionErrorKind::PoolExhausted)),
];

const MYSQL: &[(&str, Class)] = &[
    ("1062", Q(QueryErrorKind::UniqueViolation)),
    ("ER_DUP_ENTRY", Q(QueryErrorKind::UniqueViolation)),
    ("1586", Q(QueryErrorKind::UniqueViolation)),
    ("1452", Q(QueryErrorKind::ForeignKeyViolation)),
    ("ER_NO_REFERENCED_ROW_2", Q(QueryErrorKind::ForeignKeyViolation)),
    ("1451", Q(QueryErrorKind::ForeignKeyViolation)),
    ("ER_ROW_IS_REFERENCED_2", Q(QueryErrorKind::ForeignKeyViolation)),
    ("1048", Q(QueryErrorKind::NotNullViolation)),
    ("ER_BAD_NULL_ERROR", Q(QueryErrorKind::NotNullViolation)),
    ("1364", Q(QueryErrorKind::NotNullViolation)),
    ("3819", Q(QueryErrorKind::CheckViolation)),
    ("1064", Q(QueryErrorKind::Syntax)),
    ("ER_PARSE_ERROR", Q(QueryErrorKind::Syntax)),
    ("1146", Q(QueryErrorKind::TableNotFound)),
    ("ER_NO_SUCH_TABLE", Q(QueryErrorKind::TableNotFound)),
    ("1054", Q(QueryErrorKind::ColumnNotFound)),
    ("ER_BAD_FIELD_ERROR", Q(QueryErrorKind::ColumnNotFound)),
    ("1213", Q(QueryErrorKind::Deadlock)),
    ("ER_LOCK_DEADLOCK", Q(QueryErrorKind::Deadlock)),
    ("1205", Q(QueryErrorKind::LockTimeout)),
    ("ER_LOCK_WAIT_TIMEOUT", Q(QueryErrorKind::LockTimeout)),
    ("3024", Q(QueryErrorKind::Timeout)),
    ("1045", C(ConnectionErrorKind::AuthenticationFailed)),
    ("ER_ACCESS_DENIED_ERROR", C(ConnectionErrorKind::AuthenticationFailed)),
    ("1040", C(ConnectionErrorKind::PoolExhausted)),
    ("2002", C(ConnectionErrorKind::HostUnreachable)),
    ("2003", C(ConnectionErrorKind::HostUnreachable)),
    ("3159", C(ConnectionErrorKind::SslRequired)),
];

// Extended result codes first; the primary code 19 (constraint) is
// resolved from the message.
const SQLITE: &[(&str, Class)] = &[
    ("2067", Q(QueryErrorKind::UniqueViolation)),
    ("1555", Q(QueryErrorKind::UniqueViolation)),
    ("787", Q(QueryErrorKind::ForeignKeyViolation)),
    ("1299", Q(QueryErrorKind::NotNullViolation)),
    ("275", Q(QueryErrorKind::CheckViolation)),
    ("5", Q(QueryErrorKind::LockTimeout)),
    ("6", Q(QueryErrorKind::LockTimeout)),
    ("14", C(ConnectionErrorKind::HostUnreachable)),
    ("23", C(ConnectionErrorKind::AuthenticationFailed)),
];

const MESSAGES: &[(&str, Class)] = &[
    ("unique constraint", Q(QueryErrorKind::UniqueViolation)),
    ("duplicate key", Q(QueryErrorKind::UniqueViolation)),
    ("duplicate entry", Q(QueryErrorKind::UniqueViolation)),
    ("foreign key constraint", Q(QueryErrorKind::ForeignKeyViolation)),
    ("not null constraint", Q(QueryErrorKind::NotNullViolation)),
    ("check constraint", Q(QueryErrorKind::CheckViolation)),
    ("no such table", Q(QueryErrorKind::TableNotFound)),
    ("no such column", Q(QueryErrorKind::ColumnNotFound)),
    ("syntax error", Q(QueryErrorKind::Syntax)),
    ("deadlock", Q(QueryErrorKind::Deadlock)),
    ("database is locked", Q(QueryErrorKind::LockTimeout)),
    ("ssl", C(ConnectionErrorKind::SslRequired)),
    ("timed out", C(ConnectionErrorKind::Timeout)),
    ("connection refused", C(ConnectionErrorKind::HostUnreachable)),
];

fn table(kind: DialectKind) -> &'static [(&'static str, Class)] {
    match kind {
        DialectKind::Postgres => POSTGRES,
        DialectKind::MySql => MYSQL,
        DialectKind::Sqlite => SQLITE,
    }
}

fn lookup(kind: DialectKind, code: &str) -> Option<Class> {
    if let Some((_, class)) = table(kind).iter().find(|(c, _)| *c == code) {
        return Some(*class);
    }
    // SQLSTATE class 08: connection exception.
    if kind == DialectKind::Postgres && code.starts_with("08") {
        return Some(C(ConnectionErrorKind::HostUnreachable));
    }
    None
}

fn sniff(message: &str) -> Option<Class> {
    let lower = message.to_ascii_lowercase();
    MESSAGES
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, class)| *class)
}

/// Maps a native error onto the taxonomy.
#[must_use]
pub fn map_native_error(kind: DialectKind, code: Option<&str>, message: &str) -> Error {
    let class = code
        .and_then(|c| lookup(kind, c))
        .or_else(|| sniff(message))
        .unwrap_or(Q(QueryErrorKind::Other));
    let code = code.map(String::from);
    match class {
        Q(kind) => QueryError {
            kind,
            code,
            message: String::from(message),
        }
        .into(),
        C(kind) => ConnectionError {
            kind,
            code,
            message: String::from(message),
        }
        .into(),
    }
}
