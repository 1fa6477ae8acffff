//! SELECT assembly.
//!
//! [`QueryParts`] is the dialect-neutral description of a SELECT. The
//! assembler renders it through a [`DialectAdapter`] into one
//! [`Fragment`]. `DISTINCT ON` is native on PostgreSQL; elsewhere it is
//! emulated with `ROW_NUMBER()` over a derived table, which needs an
//! explicit select list. Both forms order by the distinct keys first.

use crate::dialect::DialectAdapter;
use crate::error::{Error, Result};
use crate::filter::{ColumnRef, Filter};
use crate::fragment::Fragment;

/// Alias of the row-number column used by the DISTINCT ON emulation.
pub const DISTINCT_ROW_NUMBER: &str = "_rn";
/// Alias of the derived table used by the DISTINCT ON emulation.
pub const DISTINCT_SUBQUERY: &str = "_distinct";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOperator {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// A common table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub columns: Vec<String>,
    pub query: Fragment,
    pub recursive: bool,
    /// The body is INSERT / UPDATE / DELETE.
    pub mutation: bool,
    /// `MATERIALIZED` / `NOT MATERIALIZED` hint, honored on PostgreSQL.
    pub materialized: Option<bool>,
}

impl Cte {
    /// Creates a plain CTE.
    #[must_use]
    pub fn new(name: impl Into<String>, query: Fragment) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            query,
            recursive: false,
            mutation: false,
            materialized: None,
        }
    }
}

/// A table in FROM or JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    #[must_use]
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Name other clauses use to refer to this table.
    #[must_use]
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn render<D: DialectAdapter + ?Sized>(&self, dialect: &D) -> Fragment {
        let table = dialect.identifier(&self.name);
        match &self.alias {
            Some(alias) => table.with_raw(" AS ").then(dialect.identifier(alias)),
            None => table,
        }
    }
}

/// One item of the select list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`.
    All,
    Column {
        column: ColumnRef,
        alias: Option<String>,
    },
    /// Any expression; the alias is required so the item has a name.
    Expr { expr: Fragment, alias: String },
}

impl SelectItem {
    /// A column by `name` or `table.name`.
    #[must_use]
    pub fn column(path: &str) -> Self {
        Self::Column {
            column: ColumnRef::parse(path),
            alias: None,
        }
    }

    fn output_name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Column { column, alias } => Some(alias.as_deref().unwrap_or(&column.name)),
            Self::Expr { alias, .. } => Some(alias),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    /// Unqualified columns refer to the joined table.
    pub on: Option<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: SortDirection,
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    #[must_use]
    pub fn asc(path: &str) -> Self {
        Self {
            column: ColumnRef::parse(path),
            direction: SortDirection::Asc,
            nulls: None,
        }
    }

    #[must_use]
    pub fn desc(path: &str) -> Self {
        Self {
            column: ColumnRef::parse(path),
            direction: SortDirection::Desc,
            nulls: None,
        }
    }

    #[must_use]
    pub const fn nulls(mut self, nulls: NullsOrder) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

/// Dialect-neutral description of a SELECT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParts {
    pub ctes: Vec<Cte>,
    pub distinct: bool,
    /// Keep the first row of each group of equal values.
    pub distinct_on: Vec<ColumnRef>,
    /// Empty means `*`.
    pub select: Vec<SelectItem>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub filter: Option<Filter>,
    pub group_by: Vec<ColumnRef>,
    pub having: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryParts {
    /// Starts a query over one table.
    #[must_use]
    pub fn from_table(name: &str) -> Self {
        Self {
            from: Some(TableRef::new(name)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.select
            .extend(columns.iter().map(|c| SelectItem::column(c)));
        self
    }

    #[must_use]
    pub fn select_expr(mut self, expr: Fragment, alias: &str) -> Self {
        self.select.push(SelectItem::Expr {
            expr,
            alias: String::from(alias),
        });
        self
    }

    #[must_use]
    pub fn join(mut self, kind: JoinKind, table: TableRef, on: Option<Filter>) -> Self {
        self.joins.push(Join { kind, table, on });
        self
    }

    /// Adds a WHERE condition, AND-ed with any existing one.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    #[must_use]
    pub fn distinct_on(mut self, columns: &[&str]) -> Self {
        self.distinct_on
            .extend(columns.iter().map(|c| ColumnRef::parse(c)));
        self
    }

    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by.extend(columns.iter().map(|c| ColumnRef::parse(c)));
        self
    }

    #[must_use]
    pub fn having(mut self, filter: Filter) -> Self {
        self.having = Some(filter);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }
}

/// Renders a SELECT statement.
///
/// # Errors
///
/// Fails without a FROM table, on invalid filters, or when the dialect
/// cannot express a requested clause.
pub fn assemble<D: DialectAdapter + ?Sized>(parts: &QueryParts, dialect: &D) -> Result<Fragment> {
    let from = parts
        .from
        .as_ref()
        .ok_or_else(|| Error::ast("query", "missing FROM table"))?;
    let body = if parts.distinct_on.is_empty() {
        plain_select(parts, from, dialect)?
    } else if dialect.capabilities().supports_distinct_on {
        native_distinct_on(parts, from, dialect)?
    } else {
        emulated_distinct_on(parts, from, dialect)?
    };
    let with = dialect.with_clause(&parts.ctes)?;
    Ok(Fragment::join([with, body], " "))
}

fn select_list<D: DialectAdapter + ?Sized>(
    parts: &QueryParts,
    table: &str,
    dialect: &D,
) -> Fragment {
    if parts.select.is_empty() {
        return Fragment::raw("*");
    }
    let items = parts.select.iter().map(|item| match item {
        SelectItem::All => Fragment::raw("*"),
        SelectItem::Column { column, alias } => {
            let col = column.render(dialect, Some(table));
            match alias {
                Some(alias) => col.with_raw(" AS ").then(dialect.identifier(alias)),
                None => col,
            }
        }
        SelectItem::Expr { expr, alias } => expr
            .clone()
            .with_raw(" AS ")
            .then(dialect.identifier(alias)),
    });
    Fragment::join(items, ", ")
}

/// FROM, joins, WHERE, GROUP BY and HAVING.
fn source_clauses<D: DialectAdapter + ?Sized>(
    parts: &QueryParts,
    from: &TableRef,
    dialect: &D,
) -> Result<Fragment> {
    let table = from.reference();
    let mut clauses = vec![Fragment::raw("FROM ").then(from.render(dialect))];
    for join in &parts.joins {
        let on = match &join.on {
            Some(filter) => Some(filter.to_fragment(dialect, Some(join.table.reference()))?),
            None => None,
        };
        clauses.push(dialect.join(join.kind, join.table.render(dialect), on)?);
    }
    if let Some(filter) = &parts.filter {
        clauses.push(Fragment::raw("WHERE ").then(filter.to_fragment(dialect, Some(table))?));
    }
    let group: Vec<Fragment> = parts
        .group_by
        .iter()
        .map(|c| c.render(dialect, Some(table)))
        .collect();
    clauses.push(dialect.group_by(group));
    if let Some(having) = &parts.having {
        clauses.push(Fragment::raw("HAVING ").then(having.to_fragment(dialect, Some(table))?));
    }
    Ok(Fragment::join(clauses, " "))
}

fn order_keys<D: DialectAdapter + ?Sized>(
    order: &[OrderBy],
    table: &str,
    dialect: &D,
) -> Vec<Fragment> {
    order
        .iter()
        .map(|o| dialect.order_item(o.column.render(dialect, Some(table)), o.direction, o.nulls))
        .collect()
}

fn plain_select<D: DialectAdapter + ?Sized>(
    parts: &QueryParts,
    from: &TableRef,
    dialect: &D,
) -> Result<Fragment> {
    let table = from.reference();
    let keyword = if parts.distinct { "SELECT DISTINCT " } else { "SELECT " };
    Ok(Fragment::join(
        [
            Fragment::raw(keyword).then(select_list(parts, table, dialect)),
            source_clauses(parts, from, dialect)?,
            dialect.order_by(order_keys(&parts.order_by, table, dialect)),
            dialect.limit_offset(parts.limit, parts.offset),
        ],
        " ",
    ))
}

fn same_column(a: &ColumnRef, b: &ColumnRef, table: &str) -> bool {
    a.name == b.name && a.table.as_deref().unwrap_or(table) == b.table.as_deref().unwrap_or(table)
}

/// ORDER BY of a DISTINCT ON query: the keys lead, in the direction the
/// caller ordered them or ascending, followed by the rest of the order.
fn distinct_order(parts: &QueryParts, table: &str) -> Vec<OrderBy> {
    let is_key = |o: &OrderBy| {
        parts
            .distinct_on
            .iter()
            .any(|d| same_column(d, &o.column, table))
    };
    let leading = parts.order_by.iter().take_while(|o| is_key(o)).count();
    let mut order = parts.order_by[..leading].to_vec();
    for d in &parts.distinct_on {
        if !order.iter().any(|o| same_column(d, &o.column, table)) {
            let requested = parts
                .order_by
                .iter()
                .find(|o| same_column(d, &o.column, table));
            order.push(requested.cloned().unwrap_or_else(|| OrderBy {
                column: d.clone(),
                direction: SortDirection::Asc,
                nulls: None,
            }));
        }
    }
    order.extend(parts.order_by[leading..].iter().filter(|o| !is_key(o)).cloned());
    order
}

fn native_distinct_on<D: DialectAdapter + ?Sized>(
    parts: &QueryParts,
    from: &TableRef,
    dialect: &D,
) -> Result<Fragment> {
    let table = from.reference();
    let distinct: Vec<Fragment> = parts
        .distinct_on
        .iter()
        .map(|c| c.render(dialect, Some(table)))
        .collect();
    let order = distinct_order(parts, table);

    Ok(Fragment::join(
        [
            Fragment::raw("SELECT ")
                .then(dialect.distinct_on(distinct)?)
                .with_raw(" ")
                .then(select_list(parts, table, dialect)),
            source_clauses(parts, from, dialect)?,
            dialect.order_by(order_keys(&order, table, dialect)),
            dialect.limit_offset(parts.limit, parts.offset),
        ],
        " ",
    ))
}

/// `ROW_NUMBER()` over a derived table. The outer query projects the
/// select list by name, so a `*` cannot be emulated without also
/// returning the helper columns.
fn emulated_distinct_on<D: DialectAdapter + ?Sized>(
    parts: &QueryParts,
    from: &TableRef,
    dialect: &D,
) -> Result<Fragment> {
    if parts.select.is_empty() || parts.select.contains(&SelectItem::All) {
        return Err(dialect.unsupported(
            "DISTINCT ON over `*`",
            "assemble",
            "list the selected columns explicitly",
        ));
    }
    let table = from.reference();
    let outer = |name: &str| dialect.qualified(DISTINCT_SUBQUERY, name);

    let mut inner_items = Vec::new();
    let mut outer_items = Vec::new();
    for item in &parts.select {
        let (expr, name) = match item {
            SelectItem::Column { column, alias } => (
                column.render(dialect, Some(table)),
                alias.as_deref().unwrap_or(&column.name),
            ),
            SelectItem::Expr { expr, alias } => (expr.clone(), alias.as_str()),
            SelectItem::All => continue,
        };
        inner_items.push(expr.with_raw(" AS ").then(dialect.identifier(name)));
        outer_items.push(outer(name));
    }

    // Order keys reuse a selected column or travel as hidden columns.
    let order = distinct_order(parts, table);
    let mut outer_order = Vec::new();
    for (i, o) in order.iter().enumerate() {
        let visible = parts.select.iter().find_map(|item| match item {
            SelectItem::Column { column, alias } if same_column(column, &o.column, table) => {
                Some(alias.as_deref().unwrap_or(&column.name))
            }
            _ => None,
        });
        let name = visible.map_or_else(
            || {
                let hidden = format!("_o{i}");
                inner_items.push(
                    o.column
                        .render(dialect, Some(table))
                        .with_raw(" AS ")
                        .then(dialect.identifier(&hidden)),
                );
                hidden
            },
            String::from,
        );
        outer_order.push(dialect.order_item(outer(&name), o.direction, o.nulls));
    }

    let partition: Vec<Fragment> = parts
        .distinct_on
        .iter()
        .map(|c| c.render(dialect, Some(table)))
        .collect();
    let window = Fragment::raw("ROW_NUMBER() OVER (PARTITION BY ")
        .then(Fragment::join(partition, ", "))
        .with_raw(" ORDER BY ")
        .then(Fragment::join(order_keys(&order, table, dialect), ", "));
    inner_items.push(
        window
            .with_raw(") AS ")
            .then(dialect.identifier(DISTINCT_ROW_NUMBER)),
    );

    let inner = Fragment::join(
        [
            Fragment::raw("SELECT ").then(Fragment::join(inner_items, ", ")),
            source_clauses(parts, from, dialect)?,
        ],
        " ",
    );

    Ok(Fragment::join(
        [
            Fragment::raw("SELECT ").then(Fragment::join(outer_items, ", ")),
            Fragment::raw("FROM ").then(dialect.derived_table(inner, DISTINCT_SUBQUERY)),
            Fragment::raw("WHERE ")
                .then(outer(DISTINCT_ROW_NUMBER))
                .with_raw(" = 1"),
            dialect.order_by(outer_order),
            dialect.limit_offset(parts.limit, parts.offset),
        ],
        " ",
    ))
}
