//! Filter trees for WHERE, HAVING and ON clauses.
//!
//! A [`Filter`] is a tree of named-operator conditions combined with AND,
//! OR and NOT. It is rendered against a dialect, which escapes column
//! names and resolves each operator name through its registry.
//!
//! ```ignore
//! use oxide_sqlgen::filter::Filter;
//!
//! let filter = Filter::gte("age", 18_i64)
//!     .and(Filter::eq("status", "active").or(Filter::eq("status", "pending")));
//! ```

use crate::dialect::Dialect;
use crate::error::Result;
use crate::fragment::Fragment;
use crate::value::{SqlValue, ToSqlValue};

/// A possibly table-qualified column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// Creates a qualified column reference.
    #[must_use]
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Parses `column` or `table.column`.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((table, name)) => Self::qualified(table, name),
            None => Self::new(path),
        }
    }

    /// Renders the column, qualifying it with `default_table` when it has
    /// no table of its own.
    pub fn render<D: Dialect + ?Sized>(
        &self,
        dialect: &D,
        default_table: Option<&str>,
    ) -> Fragment {
        match self.table.as_deref().or(default_table) {
            Some(table) => dialect.qualified(table, &self.name),
            None => dialect.identifier(&self.name),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// No value (`isNull`, `isNotNull`).
    None,
    Single(SqlValue),
    List(Vec<SqlValue>),
    /// Inclusive bounds for `between`.
    Range(SqlValue, SqlValue),
    /// Another column, e.g. in a join condition.
    Column(ColumnRef),
    /// A trusted expression or subquery.
    Expr(Fragment),
}

impl FilterValue {
    /// A single bound value.
    pub fn single<T: ToSqlValue>(value: T) -> Self {
        Self::Single(value.to_sql_value())
    }

    /// A list of bound values.
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        Self::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }

    /// An inclusive range.
    pub fn range<L: ToSqlValue, H: ToSqlValue>(low: L, high: H) -> Self {
        Self::Range(low.to_sql_value(), high.to_sql_value())
    }
}

/// A leaf condition: `column <operator> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ColumnRef,
    /// Operator name or alias, resolved by the dialect's registry.
    pub operator: String,
    pub value: FilterValue,
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Condition(Condition),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// Trusted SQL, rendered verbatim with its own parameters.
    Raw(Fragment),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Parent {
    Top,
    And,
    Or,
}

impl Filter {
    /// Creates a condition with an arbitrary operator name.
    pub fn condition(column: impl Into<ColumnRef>, operator: &str, value: FilterValue) -> Self {
        Self::Condition(Condition {
            column: column.into(),
            operator: String::from(operator),
            value,
        })
    }

    /// `column = value`.
    pub fn eq<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::condition(column, "equals", FilterValue::single(value))
    }

    /// `column <> value`.
    pub fn ne<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::condition(column, "not", FilterValue::single(value))
    }

    /// `column > value`.
    pub fn gt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::condition(column, "gt", FilterValue::single(value))
    }

    /// `column >= value`.
    pub fn gte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::condition(column, "gte", FilterValue::single(value))
    }

    /// `column < value`.
    pub fn lt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::condition(column, "lt", FilterValue::single(value))
    }

    /// `column <= value`.
    pub fn lte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::condition(column, "lte", FilterValue::single(value))
    }

    /// Substring match with LIKE wildcards escaped.
    pub fn contains(column: &str, needle: &str) -> Self {
        Self::condition(column, "contains", FilterValue::single(needle))
    }

    /// `column IN (...)`.
    pub fn in_list<I, T>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        Self::condition(column, "in", FilterValue::list(values))
    }

    /// `column NOT IN (...)`.
    pub fn not_in<I, T>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        Self::condition(column, "notIn", FilterValue::list(values))
    }

    /// `column BETWEEN low AND high`.
    pub fn between<L: ToSqlValue, H: ToSqlValue>(column: &str, low: L, high: H) -> Self {
        Self::condition(column, "between", FilterValue::range(low, high))
    }

    /// `column IS NULL`.
    pub fn is_null(column: &str) -> Self {
        Self::condition(column, "isNull", FilterValue::None)
    }

    /// `column IS NOT NULL`.
    pub fn is_not_null(column: &str) -> Self {
        Self::condition(column, "isNotNull", FilterValue::None)
    }

    /// `left = right` between two columns.
    pub fn columns_eq(left: &str, right: &str) -> Self {
        Self::condition(left, "equals", FilterValue::Column(ColumnRef::parse(right)))
    }

    /// Conjunction of all filters.
    #[must_use]
    pub const fn all(filters: Vec<Self>) -> Self {
        Self::And(filters)
    }

    /// Disjunction of all filters.
    #[must_use]
    pub const fn any(filters: Vec<Self>) -> Self {
        Self::Or(filters)
    }

    /// Combines with AND, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut items = match self {
            Self::And(items) => items,
            other => vec![other],
        };
        match other {
            Self::And(more) => items.extend(more),
            other => items.push(other),
        }
        Self::And(items)
    }

    /// Combines with OR, flattening nested disjunctions.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut items = match self {
            Self::Or(items) => items,
            other => vec![other],
        };
        match other {
            Self::Or(more) => items.extend(more),
            other => items.push(other),
        }
        Self::Or(items)
    }

    /// Negates the filter.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Renders the filter for a dialect.
    ///
    /// Unqualified columns are qualified with `default_table`.
    ///
    /// # Errors
    ///
    /// Fails on unknown operator names or values of the wrong shape.
    pub fn to_fragment<D: Dialect + ?Sized>(
        &self,
        dialect: &D,
        default_table: Option<&str>,
    ) -> Result<Fragment> {
        self.render(dialect, default_table, Parent::Top)
    }

    fn render<D: Dialect + ?Sized>(
        &self,
        dialect: &D,
        table: Option<&str>,
        parent: Parent,
    ) -> Result<Fragment> {
        match self {
            Self::Condition(cond) => {
                let field = cond.column.render(dialect, table);
                let value = match &cond.value {
                    FilterValue::Column(column) => FilterValue::Expr(column.render(dialect, table)),
                    other => other.clone(),
                };
                dialect.operator(&cond.operator, field, &value)
            }
            Self::And(items) => Self::render_group(items, dialect, table, parent, Parent::And),
            Self::Or(items) => Self::render_group(items, dialect, table, parent, Parent::Or),
            Self::Not(inner) => {
                let inner = inner.render(dialect, table, Parent::Top)?;
                Ok(Fragment::raw("NOT ").then(inner.parens()))
            }
            Self::Raw(fragment) => {
                if parent == Parent::Top {
                    Ok(fragment.clone())
                } else {
                    Ok(fragment.clone().parens())
                }
            }
        }
    }

    fn render_group<D: Dialect + ?Sized>(
        items: &[Self],
        dialect: &D,
        table: Option<&str>,
        parent: Parent,
        this: Parent,
    ) -> Result<Fragment> {
        match items {
            [] => Ok(Fragment::raw(if this == Parent::And { "1=1" } else { "1=0" })),
            [single] => single.render(dialect, table, parent),
            _ => {
                let parts = items
                    .iter()
                    .map(|item| item.render(dialect, table, this))
                    .collect::<Result<Vec<_>>>()?;
                let separator = if this == Parent::And { " AND " } else { " OR " };
                let joined = Fragment::join(parts, separator);
                if parent == Parent::Top || parent == this {
                    Ok(joined)
                } else {
                    Ok(joined.parens())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};
    use crate::fragment::PlaceholderStyle;

    fn users_filter() -> Filter {
        Filter::gte("age", 18_i64)
            .and(Filter::eq("status", "active").or(Filter::eq("status", "pending")))
    }

    #[test]
    fn users_example_postgres() {
        let pg = PostgresDialect::default();
        let (sql, params) = users_filter()
            .to_fragment(&pg, Some("users"))
            .map(|f| f.render(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(
            sql,
            r#""users"."age" >= $1 AND ("users"."status" = $2 OR "users"."status" = $3)"#
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Int(18),
                SqlValue::Text("active".into()),
                SqlValue::Text("pending".into())
            ]
        );
    }

    #[test]
    fn users_example_mysql() {
        let my = MySqlDialect::default();
        let sql = users_filter()
            .to_fragment(&my, Some("users"))
            .map(|f| f.sql(PlaceholderStyle::QuestionMark))
            .unwrap_or_default();
        assert_eq!(
            sql,
            "`users`.`age` >= ? AND (`users`.`status` = ? OR `users`.`status` = ?)"
        );
    }

    #[test]
    fn and_inside_or_is_parenthesized() {
        let lite = SqliteDialect::default();
        let filter = Filter::eq("a", 1_i64)
            .and(Filter::eq("b", 2_i64))
            .or(Filter::eq("c", 3_i64));
        let sql = filter
            .to_fragment(&lite, None)
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert_eq!(sql, r#"("a" = ? AND "b" = ?) OR "c" = ?"#);
    }

    #[test]
    fn empty_groups() {
        let lite = SqliteDialect::default();
        let and = Filter::all(vec![]).to_fragment(&lite, None).map(|f| f.to_string());
        let or = Filter::any(vec![]).to_fragment(&lite, None).map(|f| f.to_string());
        assert_eq!(and.ok().as_deref(), Some("1=1"));
        assert_eq!(or.ok().as_deref(), Some("1=0"));
    }

    #[test]
    fn not_wraps_in_parens() {
        let pg = PostgresDialect::default();
        let sql = Filter::eq("deleted", true)
            .not()
            .to_fragment(&pg, None)
            .map(|f| f.sql(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(sql, r#"NOT ("deleted" = $1)"#);
    }

    #[test]
    fn column_comparison_and_explicit_qualifier() {
        let pg = PostgresDialect::default();
        let sql = Filter::columns_eq("posts.user_id", "users.id")
            .to_fragment(&pg, Some("posts"))
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert_eq!(sql, r#""posts"."user_id" = "users"."id""#);
    }

    #[test]
    fn raw_fragment_keeps_params_in_order() {
        let pg = PostgresDialect::default();
        let filter = Filter::eq("a", 1_i64)
            .and(Filter::Raw(Fragment::raw("b > ").with_param(2_i64)))
            .and(Filter::eq("c", 3_i64));
        let (sql, params) = filter
            .to_fragment(&pg, None)
            .map(|f| f.render(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(sql, r#""a" = $1 AND (b > $2) AND "c" = $3"#);
        assert_eq!(params, vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]);
    }

    #[test]
    fn unknown_operator_fails() {
        let pg = PostgresDialect::default();
        let filter = Filter::condition("a", "fuzzy", FilterValue::single(1_i64));
        assert!(filter.to_fragment(&pg, None).is_err());
    }
}
