//! # oxide-sqlgen
//!
//! Dialect-aware SQL generation for PostgreSQL, MySQL and SQLite.
//!
//! This crate provides:
//! - Composable [`Fragment`]s that keep SQL text and bound parameters apart
//!   until the final render, so values never end up in SQL text
//! - A registry of named filter operators and a [`Filter`] tree
//! - One [`DialectAdapter`] per database, with capability flags and typed
//!   "unsupported" errors for what a database cannot express
//! - A query assembler, including `DISTINCT ON` emulation
//! - A schema diff engine producing ordered, dialect-rendered migrations
//! - A single error taxonomy with native-code mapping
//!
//! ## Filters
//!
//! ```rust
//! use oxide_sqlgen::{Filter, PlaceholderStyle, PostgresDialect, SqlValue};
//!
//! let filter = Filter::gte("age", 18_i64)
//!     .and(Filter::eq("status", "active").or(Filter::eq("status", "pending")));
//! let (sql, params) = filter
//!     .to_fragment(&PostgresDialect::new(), Some("users"))
//!     .map(|f| f.render(PlaceholderStyle::Dollar))
//!     .unwrap_or_default();
//!
//! assert_eq!(
//!     sql,
//!     r#""users"."age" >= $1 AND ("users"."status" = $2 OR "users"."status" = $3)"#
//! );
//! assert_eq!(params[0], SqlValue::Int(18));
//! ```
//!
//! ## Queries
//!
//! ```rust
//! use oxide_sqlgen::query::{assemble, OrderBy, QueryParts};
//! use oxide_sqlgen::MySqlDialect;
//!
//! let parts = QueryParts::from_table("events")
//!     .select(&["user_id", "kind"])
//!     .order_by(OrderBy::desc("created_at"))
//!     .limit(10);
//! let sql = assemble(&parts, &MySqlDialect::new())
//!     .map(|f| f.to_string())
//!     .unwrap_or_default();
//! assert_eq!(
//!     sql,
//!     "SELECT `events`.`user_id`, `events`.`kind` FROM `events` ORDER BY `events`.`created_at` DESC LIMIT 10"
//! );
//! ```

pub mod dialect;
pub mod error;
pub mod error_map;
pub mod filter;
pub mod fragment;
pub mod mutation;
pub mod operators;
pub mod query;
pub mod schema;
pub mod value;

pub use dialect::{
    adapter_for, AdapterOptions, Capabilities, DialectAdapter, DialectKind, MySqlDialect,
    PostgresDialect, SqliteDialect,
};
pub use error::{is_retryable_error, Error, Result};
pub use filter::{ColumnRef, Condition, Filter, FilterValue};
pub use fragment::{Fragment, PlaceholderStyle};
pub use value::{SqlValue, ToSqlValue};
