//! Dialect adapters.
//!
//! A dialect adapter exposes the whole rendering surface for exactly one
//! database: identifier escaping, literals, operators, expressions,
//! aggregates, JSON and array operations, ordering, clauses, SET-clause
//! helpers, relation filters, subqueries, CTEs, mutations, joins, set
//! operations, migration DDL and the optional vector and geospatial
//! extensions.
//!
//! Each capability group is its own trait with default methods that
//! produce standard SQL; the per-dialect types override what differs.
//! Everything is combined in [`DialectAdapter`], and callers that need to
//! branch on features read [`Capabilities`].

mod ddl;
mod extensions;
mod mysql;
mod postgres;
mod sqlite;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use ddl::{MigrationDdl, SessionGuard};
pub use extensions::{GeoOps, Unsupported, VectorMetric, VectorOps};
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Error, Result};
use crate::error_map;
use crate::filter::FilterValue;
use crate::fragment::{Fragment, PlaceholderStyle};
use crate::mutation::{ConflictAction, Delete, Insert, Update, Upsert};
use crate::operators::{OperatorContext, OperatorRegistry};
use crate::query::{Cte, JoinKind, NullsOrder, SetOperator, SortDirection};
use crate::schema::DataType;
use crate::value::SqlValue;

/// The supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectKind {
    #[serde(rename = "postgres", alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(rename = "mysql", alias = "mariadb")]
    MySql,
    #[serde(rename = "sqlite", alias = "sqlite3")]
    Sqlite,
}

impl DialectKind {
    /// Every supported dialect.
    pub const ALL: [Self; 3] = [Self::Postgres, Self::MySql, Self::Sqlite];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Identifier quote character.
    #[must_use]
    pub const fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite => '"',
        }
    }

    /// Placeholder convention of the usual drivers for this dialect.
    #[must_use]
    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Self::Postgres => PlaceholderStyle::Dollar,
            Self::MySql | Self::Sqlite => PlaceholderStyle::QuestionMark,
        }
    }

    /// Guesses the dialect from a connection URL scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?;
        scheme.parse().ok()
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(Error::invalid_argument(format!("unknown dialect `{other}`"))),
        }
    }
}

/// Feature flags callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub supports_returning: bool,
    pub supports_cte_with_mutations: bool,
    pub supports_full_outer_join: bool,
    pub supports_distinct_on: bool,
    pub supports_ilike: bool,
    pub supports_native_arrays: bool,
    /// DDL statements can run inside a transaction and be rolled back.
    pub supports_transactional_ddl: bool,
    /// Named enum types (`CREATE TYPE ... AS ENUM`).
    pub supports_enum_types: bool,
    /// `NULLS FIRST` / `NULLS LAST` in ORDER BY.
    pub supports_nulls_ordering: bool,
}

/// Optional extensions enabled on the target database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// pgvector is installed.
    #[serde(default)]
    pub vector: bool,
    /// PostGIS is installed.
    #[serde(default)]
    pub postgis: bool,
}

/// Builds a function call `NAME(arg, ...)`.
#[must_use]
pub fn call(name: &str, args: Vec<Fragment>) -> Fragment {
    Fragment::raw(name)
        .with_raw("(")
        .then(Fragment::join(args, ", "))
        .with_raw(")")
}

/// Base surface: naming, escaping, values and operators.
pub trait Dialect: Send + Sync {
    fn kind(&self) -> DialectKind;

    fn capabilities(&self) -> &Capabilities;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.kind().placeholder_style()
    }

    fn quote_char(&self) -> char {
        self.kind().quote_char()
    }

    /// Quotes an identifier, doubling embedded quote characters.
    fn escape_identifier(&self, name: &str) -> String {
        let q = self.quote_char();
        let doubled: String = [q, q].iter().collect();
        format!("{q}{}{q}", name.replace(q, &doubled))
    }

    fn identifier(&self, name: &str) -> Fragment {
        Fragment::raw(self.escape_identifier(name))
    }

    /// `"table"."column"`.
    fn qualified(&self, table: &str, column: &str) -> Fragment {
        Fragment::raw(format!(
            "{}.{}",
            self.escape_identifier(table),
            self.escape_identifier(column)
        ))
    }

    /// Renders a value as an inline SQL literal.
    fn literal(&self, value: &SqlValue) -> String {
        value.to_sql_inline()
    }

    /// Binds a value as a parameter, adapting types the driver cannot
    /// bind natively.
    fn value(&self, value: SqlValue) -> Fragment {
        Fragment::param(value)
    }

    fn operators(&self) -> &OperatorRegistry {
        OperatorRegistry::standard()
    }

    fn operator_context(&self) -> OperatorContext {
        OperatorContext::for_kind(self.kind())
    }

    /// Renders one named predicate.
    ///
    /// # Errors
    ///
    /// Returns a query error for unknown operators or mismatched values.
    fn operator(&self, name: &str, field: Fragment, value: &FilterValue) -> Result<Fragment> {
        self.operators()
            .render(name, &self.operator_context(), field, value)
    }

    /// Maps a native error code and message onto the taxonomy.
    fn map_error(&self, code: Option<&str>, message: &str) -> Error {
        error_map::map_native_error(self.kind(), code, message)
    }

    /// Builds the "unsupported" error for this dialect.
    fn unsupported(&self, feature: &str, method: &str, suggestion: &str) -> Error {
        Error::not_supported(self.name(), feature, method, suggestion)
    }
}

/// Scalar expressions.
pub trait ExpressionOps: Dialect {
    fn abs(&self, x: Fragment) -> Fragment {
        call("ABS", vec![x])
    }

    fn ceil(&self, x: Fragment) -> Fragment {
        call("CEIL", vec![x])
    }

    fn floor(&self, x: Fragment) -> Fragment {
        call("FLOOR", vec![x])
    }

    fn round(&self, x: Fragment, digits: Option<u32>) -> Fragment {
        match digits {
            Some(d) => call("ROUND", vec![x, Fragment::raw(d.to_string())]),
            None => call("ROUND", vec![x]),
        }
    }

    fn lower(&self, x: Fragment) -> Fragment {
        call("LOWER", vec![x])
    }

    fn upper(&self, x: Fragment) -> Fragment {
        call("UPPER", vec![x])
    }

    fn trim(&self, x: Fragment) -> Fragment {
        call("TRIM", vec![x])
    }

    /// Length in characters.
    fn length(&self, x: Fragment) -> Fragment {
        call("LENGTH", vec![x])
    }

    /// String concatenation.
    fn concat(&self, parts: Vec<Fragment>) -> Fragment {
        Fragment::join(parts, " || ").parens()
    }

    fn coalesce(&self, parts: Vec<Fragment>) -> Fragment {
        call("COALESCE", parts)
    }

    fn now(&self) -> Fragment {
        Fragment::raw("CURRENT_TIMESTAMP")
    }

    /// Type name used in `CAST(x AS ...)`.
    ///
    /// # Errors
    ///
    /// Fails for types the dialect cannot cast to.
    fn cast_type(&self, data_type: &DataType) -> Result<String>;

    /// `CAST(x AS type)`.
    ///
    /// # Errors
    ///
    /// Fails for types the dialect cannot cast to.
    fn cast(&self, x: Fragment, data_type: &DataType) -> Result<Fragment> {
        let ty = self.cast_type(data_type)?;
        Ok(Fragment::raw("CAST(").then(x).with_raw(&format!(" AS {ty})")))
    }
}

/// Aggregate functions.
pub trait AggregateOps: Dialect {
    /// `COUNT(x)`, or `COUNT(*)` without an argument.
    fn count(&self, x: Option<Fragment>) -> Fragment {
        x.map_or_else(|| Fragment::raw("COUNT(*)"), |x| call("COUNT", vec![x]))
    }

    fn count_distinct(&self, x: Fragment) -> Fragment {
        Fragment::raw("COUNT(DISTINCT ").then(x).with_raw(")")
    }

    fn sum(&self, x: Fragment) -> Fragment {
        call("SUM", vec![x])
    }

    fn avg(&self, x: Fragment) -> Fragment {
        call("AVG", vec![x])
    }

    fn min(&self, x: Fragment) -> Fragment {
        call("MIN", vec![x])
    }

    fn max(&self, x: Fragment) -> Fragment {
        call("MAX", vec![x])
    }

    /// Aggregates values into a JSON array.
    fn json_agg(&self, x: Fragment) -> Fragment;

    /// Concatenates values with a separator.
    fn string_agg(&self, x: Fragment, separator: &str) -> Fragment;
}

/// One step of a JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(String::from(key))
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Renders a path in the `$."key"[0]` syntax used by MySQL and SQLite.
#[must_use]
pub fn json_path(path: &[PathSegment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
                out.push_str(&format!(".\"{escaped}\""));
            }
            PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}

/// JSON document operations.
pub trait JsonOps: Dialect {
    /// Extracts a JSON value at `path`.
    fn json_get(&self, column: Fragment, path: &[PathSegment]) -> Fragment;

    /// Extracts the value at `path` as text.
    fn json_get_text(&self, column: Fragment, path: &[PathSegment]) -> Fragment;

    /// Document containment.
    ///
    /// # Errors
    ///
    /// Fails where the dialect has no containment operator.
    fn json_contains(&self, column: Fragment, value: &serde_json::Value) -> Result<Fragment>;

    /// Top-level key presence.
    fn json_has_key(&self, column: Fragment, key: &str) -> Fragment;

    fn json_array_length(&self, column: Fragment) -> Fragment;

    /// Returns the document with `path` set to `value`.
    ///
    /// # Errors
    ///
    /// Fails on an empty path.
    fn json_set(&self, column: Fragment, path: &[PathSegment], value: SqlValue)
        -> Result<Fragment>;
}

/// Scalar-list operations, native or emulated with JSON arrays.
pub trait ArrayOps: Dialect {
    /// The list contains `value`.
    fn array_has(&self, column: Fragment, value: SqlValue) -> Fragment;

    /// The list contains every value.
    fn array_has_every(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment;

    /// The list contains at least one of the values.
    fn array_has_some(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment;

    fn array_is_empty(&self, column: Fragment) -> Fragment;

    fn array_length(&self, column: Fragment) -> Fragment;

    /// Element at a zero-based index.
    fn array_get(&self, column: Fragment, index: usize) -> Fragment;
}

/// ORDER BY rendering.
pub trait OrderOps: Dialect {
    /// One ORDER BY key.
    fn order_item(
        &self,
        expr: Fragment,
        direction: SortDirection,
        nulls: Option<NullsOrder>,
    ) -> Fragment {
        let mut item = expr.with_raw(" ").with_raw(direction.as_sql());
        match nulls {
            Some(NullsOrder::First) => item.push_raw(" NULLS FIRST"),
            Some(NullsOrder::Last) => item.push_raw(" NULLS LAST"),
            None => {}
        }
        item
    }

    /// `ORDER BY a, b`, or nothing without keys.
    fn order_by(&self, items: Vec<Fragment>) -> Fragment {
        if items.is_empty() {
            return Fragment::empty();
        }
        Fragment::raw("ORDER BY ").then(Fragment::join(items, ", "))
    }
}

/// Clause-level rendering.
pub trait ClauseOps: Dialect {
    /// LIMIT / OFFSET. OFFSET without LIMIT is rendered the way the dialect
    /// accepts it.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Fragment {
        let mut out = Fragment::empty();
        if let Some(limit) = limit {
            out.push_raw(&format!("LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            if !out.is_empty() {
                out.push_raw(" ");
            }
            out.push_raw(&format!("OFFSET {offset}"));
        }
        out
    }

    /// `RETURNING a, b`. Empty where unsupported; callers check
    /// [`Capabilities::supports_returning`].
    fn returning(&self, columns: &[String]) -> Fragment {
        if columns.is_empty() || !self.capabilities().supports_returning {
            return Fragment::empty();
        }
        let cols = columns.iter().map(|c| {
            if c == "*" {
                Fragment::raw("*")
            } else {
                self.identifier(c)
            }
        });
        Fragment::raw("RETURNING ").then(Fragment::join(cols, ", "))
    }

    /// `DISTINCT ON (...)`.
    ///
    /// # Errors
    ///
    /// Fails where not native; the query assembler emulates it instead.
    fn distinct_on(&self, columns: Vec<Fragment>) -> Result<Fragment> {
        let _ = columns;
        Err(self.unsupported(
            "DISTINCT ON",
            "distinct_on",
            "use the query assembler, which emulates it with ROW_NUMBER()",
        ))
    }

    fn group_by(&self, columns: Vec<Fragment>) -> Fragment {
        if columns.is_empty() {
            return Fragment::empty();
        }
        Fragment::raw("GROUP BY ").then(Fragment::join(columns, ", "))
    }
}

/// Assignment helpers for UPDATE ... SET.
pub trait SetClauseOps: Dialect + JsonOps {
    /// `"column" = value`.
    fn assign(&self, column: &str, value: SqlValue) -> Fragment {
        self.assign_expr(column, self.value(value))
    }

    /// `"column" = expr`.
    fn assign_expr(&self, column: &str, expr: Fragment) -> Fragment {
        self.identifier(column).with_raw(" = ").then(expr)
    }

    fn increment(&self, column: &str, by: SqlValue) -> Fragment {
        self.arithmetic(column, "+", by)
    }

    fn decrement(&self, column: &str, by: SqlValue) -> Fragment {
        self.arithmetic(column, "-", by)
    }

    fn multiply(&self, column: &str, by: SqlValue) -> Fragment {
        self.arithmetic(column, "*", by)
    }

    fn divide(&self, column: &str, by: SqlValue) -> Fragment {
        self.arithmetic(column, "/", by)
    }

    #[doc(hidden)]
    fn arithmetic(&self, column: &str, op: &str, by: SqlValue) -> Fragment {
        let expr = self
            .identifier(column)
            .with_raw(&format!(" {op} "))
            .then(self.value(by));
        self.assign_expr(column, expr)
    }

    /// Appends a value to a list column.
    fn array_push(&self, column: &str, value: SqlValue) -> Fragment;

    /// Replaces the element at a zero-based index of a list column.
    fn array_set(&self, column: &str, index: usize, value: SqlValue) -> Fragment;

    /// Sets a path inside a JSON column.
    ///
    /// # Errors
    ///
    /// Fails on an empty path.
    fn json_set_path(
        &self,
        column: &str,
        path: &[PathSegment],
        value: SqlValue,
    ) -> Result<Fragment> {
        let expr = self.json_set(self.identifier(column), path, value)?;
        Ok(self.assign_expr(column, expr))
    }
}

/// A parent-to-child link used by relation filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLink {
    pub parent_table: String,
    pub parent_column: String,
    pub child_table: String,
    /// Column of the child holding the parent key.
    pub child_column: String,
}

/// Relation filters (`some`, `every`, `none`) as correlated EXISTS.
pub trait RelationFilterOps: Dialect {
    #[doc(hidden)]
    fn relation_subquery(&self, link: &RelationLink, condition: Option<Fragment>) -> Fragment {
        let mut sub = Fragment::raw("SELECT 1 FROM ")
            .then(self.identifier(&link.child_table))
            .with_raw(" WHERE ")
            .then(self.qualified(&link.child_table, &link.child_column))
            .with_raw(" = ")
            .then(self.qualified(&link.parent_table, &link.parent_column));
        if let Some(condition) = condition {
            sub = sub.with_raw(" AND ").then(condition.parens());
        }
        sub
    }

    /// At least one related row matches.
    fn relation_some(&self, link: &RelationLink, filter: Option<Fragment>) -> Fragment {
        Fragment::raw("EXISTS ").then(self.relation_subquery(link, filter).parens())
    }

    /// No related row matches.
    fn relation_none(&self, link: &RelationLink, filter: Option<Fragment>) -> Fragment {
        Fragment::raw("NOT EXISTS ").then(self.relation_subquery(link, filter).parens())
    }

    /// Every related row matches (vacuously true without related rows).
    fn relation_every(&self, link: &RelationLink, filter: Option<Fragment>) -> Fragment {
        let Some(filter) = filter else {
            return Fragment::raw("1=1");
        };
        let negated = Fragment::raw("NOT ").then(filter.parens());
        Fragment::raw("NOT EXISTS ").then(self.relation_subquery(link, Some(negated)).parens())
    }
}

/// Subquery forms.
pub trait SubqueryOps: Dialect {
    fn in_subquery(&self, expr: Fragment, subquery: Fragment, negated: bool) -> Fragment {
        let keyword = if negated { " NOT IN " } else { " IN " };
        expr.with_raw(keyword).then(subquery.parens())
    }

    fn exists(&self, subquery: Fragment, negated: bool) -> Fragment {
        let keyword = if negated { "NOT EXISTS " } else { "EXISTS " };
        Fragment::raw(keyword).then(subquery.parens())
    }

    /// A scalar subquery used as a value.
    fn scalar_subquery(&self, subquery: Fragment) -> Fragment {
        subquery.parens()
    }

    /// `(subquery) AS "alias"`.
    fn derived_table(&self, subquery: Fragment, alias: &str) -> Fragment {
        subquery
            .parens()
            .with_raw(" AS ")
            .then(self.identifier(alias))
    }
}

/// WITH clauses.
pub trait CteOps: Dialect {
    /// `WITH [RECURSIVE] a AS (...), b AS (...)`.
    ///
    /// # Errors
    ///
    /// Fails when a CTE body is a data-modifying statement and the dialect
    /// cannot run those inside WITH.
    fn with_clause(&self, ctes: &[Cte]) -> Result<Fragment> {
        if ctes.is_empty() {
            return Ok(Fragment::empty());
        }
        let recursive = ctes.iter().any(|c| c.recursive);
        let mut parts = Vec::with_capacity(ctes.len());
        for cte in ctes {
            if cte.mutation && !self.capabilities().supports_cte_with_mutations {
                return Err(self.unsupported(
                    "data-modifying CTE",
                    "with_clause",
                    "run the mutation as a separate statement",
                ));
            }
            let mut part = self.identifier(&cte.name);
            if !cte.columns.is_empty() {
                let cols = cte.columns.iter().map(|c| self.identifier(c));
                part = part.with_raw(" ").then(Fragment::join(cols, ", ").parens());
            }
            part.push_raw(" AS ");
            part.push_raw(self.materialization(cte.materialized));
            part.append(cte.query.clone().parens());
            parts.push(part);
        }
        let keyword = if recursive { "WITH RECURSIVE " } else { "WITH " };
        Ok(Fragment::raw(keyword).then(Fragment::join(parts, ", ")))
    }

    /// Materialization hint placed before the CTE body.
    fn materialization(&self, materialized: Option<bool>) -> &'static str {
        let _ = materialized;
        ""
    }
}

/// INSERT, UPDATE, DELETE and upsert.
pub trait MutationOps: Dialect + ClauseOps {
    /// `INSERT INTO t (a, b) VALUES (...), (...)`.
    ///
    /// # Errors
    ///
    /// Fails when a row's width differs from the column list.
    fn insert(&self, insert: &Insert) -> Result<Fragment> {
        let mut sql = self.insert_values(insert)?;
        append_clause(&mut sql, self.returning(&insert.returning));
        Ok(sql)
    }

    #[doc(hidden)]
    fn insert_values(&self, insert: &Insert) -> Result<Fragment> {
        let mut sql = Fragment::raw("INSERT INTO ").then(self.identifier(&insert.table));
        if insert.columns.is_empty() {
            if insert.rows.len() > 1 || insert.rows.iter().any(|r| !r.is_empty()) {
                return Err(Error::invalid_argument(
                    "values given for an insert without columns",
                ));
            }
            sql.push_raw(" ");
            sql.push_raw(self.default_values());
            return Ok(sql);
        }
        if insert.rows.is_empty() {
            return Err(Error::invalid_argument("insert without rows"));
        }
        let cols = insert.columns.iter().map(|c| self.identifier(c));
        sql = sql
            .with_raw(" ")
            .then(Fragment::join(cols, ", ").parens())
            .with_raw(" VALUES ");
        let mut rows = Vec::with_capacity(insert.rows.len());
        for row in &insert.rows {
            if row.len() != insert.columns.len() {
                return Err(Error::invalid_argument(format!(
                    "row has {} values for {} columns",
                    row.len(),
                    insert.columns.len()
                )));
            }
            let values = row.iter().map(|v| self.value(v.clone()));
            rows.push(Fragment::join(values, ", ").parens());
        }
        Ok(sql.then(Fragment::join(rows, ", ")))
    }

    /// Insert form for a row made only of defaults.
    fn default_values(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    /// `UPDATE t SET ... WHERE ...`.
    ///
    /// # Errors
    ///
    /// Fails without assignments or on an invalid filter.
    fn update(&self, update: &Update) -> Result<Fragment> {
        if update.set.is_empty() {
            return Err(Error::invalid_argument("update without assignments"));
        }
        let mut sql = Fragment::raw("UPDATE ")
            .then(self.identifier(&update.table))
            .with_raw(" SET ")
            .then(Fragment::join(update.set.iter().cloned(), ", "));
        if let Some(filter) = &update.filter {
            sql = sql
                .with_raw(" WHERE ")
                .then(filter.to_fragment(self, Some(&update.table))?);
        }
        append_clause(&mut sql, self.returning(&update.returning));
        Ok(sql)
    }

    /// `DELETE FROM t WHERE ...`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid filter.
    fn delete(&self, delete: &Delete) -> Result<Fragment> {
        let mut sql = Fragment::raw("DELETE FROM ").then(self.identifier(&delete.table));
        if let Some(filter) = &delete.filter {
            sql = sql
                .with_raw(" WHERE ")
                .then(filter.to_fragment(self, Some(&delete.table))?);
        }
        append_clause(&mut sql, self.returning(&delete.returning));
        Ok(sql)
    }

    /// `INSERT ... ON CONFLICT (target) DO UPDATE SET c = EXCLUDED.c`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid insert, or an update action without target.
    fn upsert(&self, upsert: &Upsert) -> Result<Fragment> {
        let mut sql = self.insert_values(&upsert.insert)?;
        sql.push_raw(" ON CONFLICT");
        if !upsert.conflict_target.is_empty() {
            let target = upsert.conflict_target.iter().map(|c| self.identifier(c));
            sql = sql.with_raw(" ").then(Fragment::join(target, ", ").parens());
        }
        match &upsert.action {
            ConflictAction::DoNothing => sql.push_raw(" DO NOTHING"),
            ConflictAction::Update(columns) => {
                if upsert.conflict_target.is_empty() {
                    return Err(Error::invalid_argument(
                        "ON CONFLICT DO UPDATE needs a conflict target",
                    ));
                }
                if columns.is_empty() {
                    return Err(Error::invalid_argument("upsert without update columns"));
                }
                let sets = columns.iter().map(|c| {
                    self.identifier(c)
                        .with_raw(" = EXCLUDED.")
                        .then(self.identifier(c))
                });
                sql = sql
                    .with_raw(" DO UPDATE SET ")
                    .then(Fragment::join(sets, ", "));
            }
        }
        append_clause(&mut sql, self.returning(&upsert.insert.returning));
        Ok(sql)
    }

    /// Expression returning the last generated key of this session.
    fn last_insert_id(&self) -> Fragment;
}

fn append_clause(sql: &mut Fragment, clause: Fragment) {
    if !clause.is_empty() {
        sql.push_raw(" ");
        sql.append(clause);
    }
}

/// JOIN rendering.
pub trait JoinOps: Dialect {
    /// `<KIND> JOIN table [ON ...]`.
    ///
    /// # Errors
    ///
    /// Fails for join kinds the dialect lacks, or a missing ON condition.
    fn join(&self, kind: JoinKind, table: Fragment, on: Option<Fragment>) -> Result<Fragment> {
        if kind == JoinKind::Full && !self.capabilities().supports_full_outer_join {
            return Err(self.unsupported(
                "FULL OUTER JOIN",
                "join",
                "combine a LEFT JOIN and a RIGHT JOIN with UNION",
            ));
        }
        let sql = Fragment::raw(kind.as_sql()).with_raw(" ").then(table);
        match (kind, on) {
            (JoinKind::Cross, None) => Ok(sql),
            (JoinKind::Cross, Some(_)) => Err(Error::ast("join", "CROSS JOIN takes no condition")),
            (_, Some(on)) => Ok(sql.with_raw(" ON ").then(on)),
            (_, None) => Err(Error::ast("join", "missing ON condition")),
        }
    }
}

/// UNION / INTERSECT / EXCEPT.
pub trait SetOps: Dialect {
    /// Whether compound members are wrapped in parentheses.
    fn parenthesize_compound_members(&self) -> bool {
        true
    }

    /// Combines queries with a set operator.
    ///
    /// # Errors
    ///
    /// Fails without any query.
    fn combine(&self, op: SetOperator, queries: Vec<Fragment>) -> Result<Fragment> {
        if queries.is_empty() {
            return Err(Error::invalid_argument("set operation without queries"));
        }
        let parens = self.parenthesize_compound_members();
        let members = queries
            .into_iter()
            .map(|q| if parens { q.parens() } else { q });
        Ok(Fragment::join(members, &format!(" {} ", op.as_sql())))
    }
}

/// The full capability surface of one dialect.
pub trait DialectAdapter:
    Dialect
    + ExpressionOps
    + AggregateOps
    + JsonOps
    + ArrayOps
    + OrderOps
    + ClauseOps
    + SetClauseOps
    + RelationFilterOps
    + SubqueryOps
    + CteOps
    + MutationOps
    + JoinOps
    + SetOps
    + MigrationDdl
{
    /// Vector similarity operations, or an unsupported marker.
    fn vector(&self) -> &dyn VectorOps;

    /// Geospatial operations, or an unsupported marker.
    fn geo(&self) -> &dyn GeoOps;
}

/// Builds the adapter for a dialect.
#[must_use]
pub fn adapter_for(kind: DialectKind, options: AdapterOptions) -> Arc<dyn DialectAdapter> {
    match kind {
        DialectKind::Postgres => Arc::new(PostgresDialect::with_options(options)),
        DialectKind::MySql => Arc::new(MySqlDialect::new()),
        DialectKind::Sqlite => Arc::new(SqliteDialect::new()),
    }
}
