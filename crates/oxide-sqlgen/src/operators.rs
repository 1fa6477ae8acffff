//! Named WHERE-clause operators.
//!
//! The registry maps operator names (and their aliases) to render
//! functions. A render function receives the already-escaped column
//! fragment and the filter value, and returns the predicate fragment.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::dialect::DialectKind;
use crate::error::{Error, Result};
use crate::filter::FilterValue;
use crate::fragment::Fragment;
use crate::value::SqlValue;

/// Signature of an operator render function.
pub type OperatorFn = fn(&OperatorContext, Fragment, &FilterValue) -> Result<Fragment>;

/// What an operator needs to know about the target dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorContext {
    pub kind: DialectKind,
    /// Identifier quote character.
    pub quote: char,
    /// Whether the dialect has a native `ILIKE`.
    pub native_ilike: bool,
}

impl OperatorContext {
    /// Builds the context for a dialect.
    #[must_use]
    pub const fn for_kind(kind: DialectKind) -> Self {
        Self {
            kind,
            quote: kind.quote_char(),
            native_ilike: matches!(kind, DialectKind::Postgres),
        }
    }

    /// Escapes an identifier the way the dialect does.
    #[must_use]
    pub fn escape_identifier(&self, name: &str) -> String {
        let q = self.quote;
        let doubled: String = [q, q].iter().collect();
        format!("{q}{}{q}", name.replace(q, &doubled))
    }

    /// `ESCAPE` clause matching [`escape_like`].
    #[must_use]
    pub const fn like_escape_clause(&self) -> &'static str {
        match self.kind {
            // MySQL string literals treat the backslash as an escape character.
            DialectKind::MySql => " ESCAPE '\\\\'",
            DialectKind::Postgres | DialectKind::Sqlite => " ESCAPE '\\'",
        }
    }
}

/// Escapes `\`, `%` and `_` so a string matches literally inside a LIKE
/// pattern using `\` as the escape character.
#[must_use]
pub fn escape_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Registry of named operators.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    handlers: HashMap<String, OperatorFn>,
    aliases: HashMap<String, String>,
}

impl OperatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in operator.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("equals", equals);
        registry.register("not", not_equals);
        registry.register("gt", |ctx, f, v| comparison(ctx, f, v, ">"));
        registry.register("gte", |ctx, f, v| comparison(ctx, f, v, ">="));
        registry.register("lt", |ctx, f, v| comparison(ctx, f, v, "<"));
        registry.register("lte", |ctx, f, v| comparison(ctx, f, v, "<="));
        registry.register("like", |ctx, f, v| like(ctx, f, v, false));
        registry.register("notLike", |ctx, f, v| like(ctx, f, v, true));
        registry.register("ilike", |ctx, f, v| ilike(ctx, f, v, false));
        registry.register("notIlike", |ctx, f, v| ilike(ctx, f, v, true));
        registry.register("contains", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::Contains, false, false)
        });
        registry.register("notContains", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::Contains, false, true)
        });
        registry.register("startsWith", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::StartsWith, false, false)
        });
        registry.register("endsWith", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::EndsWith, false, false)
        });
        registry.register("icontains", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::Contains, true, false)
        });
        registry.register("istartsWith", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::StartsWith, true, false)
        });
        registry.register("iendsWith", |ctx, f, v| {
            pattern(ctx, f, v, PatternShape::EndsWith, true, false)
        });
        registry.register("in", |ctx, f, v| in_list(ctx, f, v, false));
        registry.register("notIn", |ctx, f, v| in_list(ctx, f, v, true));
        registry.register("between", |ctx, f, v| between(ctx, f, v, false));
        registry.register("notBetween", |ctx, f, v| between(ctx, f, v, true));
        registry.register("isNull", |_, f, _| Ok(f.with_raw(" IS NULL")));
        registry.register("isNotNull", |_, f, _| Ok(f.with_raw(" IS NOT NULL")));

        registry.alias("eq", "equals");
        registry.alias("ne", "not");
        registry.alias("neq", "not");
        registry.alias("notEquals", "not");
        registry.alias("nin", "notIn");
        registry
    }

    /// Shared registry of built-in operators.
    pub fn standard() -> &'static Self {
        static STANDARD: OnceLock<OperatorRegistry> = OnceLock::new();
        STANDARD.get_or_init(Self::with_builtins)
    }

    /// Registers (or replaces) an operator.
    pub fn register(&mut self, name: &str, handler: OperatorFn) {
        self.handlers.insert(String::from(name), handler);
    }

    /// Registers an alias for an existing operator name.
    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(String::from(alias), String::from(target));
    }

    /// Looks up an operator by name or alias.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<OperatorFn> {
        let canonical = self.aliases.get(name).map_or(name, String::as_str);
        self.handlers.get(canonical).copied()
    }

    /// Returns `true` if the name or alias is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Renders one predicate.
    ///
    /// # Errors
    ///
    /// Returns a query error for unknown operator names and for values of
    /// the wrong shape.
    pub fn render(
        &self,
        name: &str,
        ctx: &OperatorContext,
        field: Fragment,
        value: &FilterValue,
    ) -> Result<Fragment> {
        let handler = self.resolve(name).ok_or_else(|| Error::unknown_operator(name))?;
        handler(ctx, field, value)
    }
}

fn operand(value: &FilterValue, op: &str) -> Result<Fragment> {
    match value {
        FilterValue::Single(v) => Ok(Fragment::param(v.clone())),
        FilterValue::Expr(f) => Ok(f.clone()),
        _ => Err(Error::invalid_argument(format!(
            "operator `{op}` expects a single value"
        ))),
    }
}

fn text_operand(value: &FilterValue, op: &str) -> Result<String> {
    match value {
        FilterValue::Single(SqlValue::Text(s)) => Ok(s.clone()),
        _ => Err(Error::invalid_argument(format!(
            "operator `{op}` expects a text value"
        ))),
    }
}

fn equals(_: &OperatorContext, field: Fragment, value: &FilterValue) -> Result<Fragment> {
    if matches!(value, FilterValue::Single(SqlValue::Null)) {
        return Ok(field.with_raw(" IS NULL"));
    }
    Ok(field.with_raw(" = ").then(operand(value, "equals")?))
}

fn not_equals(_: &OperatorContext, field: Fragment, value: &FilterValue) -> Result<Fragment> {
    if matches!(value, FilterValue::Single(SqlValue::Null)) {
        return Ok(field.with_raw(" IS NOT NULL"));
    }
    Ok(field.with_raw(" <> ").then(operand(value, "not")?))
}

fn comparison(
    _: &OperatorContext,
    field: Fragment,
    value: &FilterValue,
    op: &str,
) -> Result<Fragment> {
    let rhs = operand(value, op)?;
    Ok(field.with_raw(&format!(" {op} ")).then(rhs))
}

fn like(
    _: &OperatorContext,
    field: Fragment,
    value: &FilterValue,
    negated: bool,
) -> Result<Fragment> {
    let keyword = if negated { " NOT LIKE " } else { " LIKE " };
    Ok(field.with_raw(keyword).then(operand(value, "like")?))
}

fn ilike(
    ctx: &OperatorContext,
    field: Fragment,
    value: &FilterValue,
    negated: bool,
) -> Result<Fragment> {
    let rhs = operand(value, "ilike")?;
    Ok(case_insensitive_like(ctx, field, rhs, negated, ""))
}

fn case_insensitive_like(
    ctx: &OperatorContext,
    field: Fragment,
    rhs: Fragment,
    negated: bool,
    escape: &str,
) -> Fragment {
    let not = if negated { " NOT" } else { "" };
    if ctx.native_ilike {
        return field
            .with_raw(&format!("{not} ILIKE "))
            .then(rhs)
            .with_raw(escape);
    }
    Fragment::raw("LOWER(")
        .then(field)
        .with_raw(&format!("){not} LIKE LOWER("))
        .then(rhs)
        .with_raw(")")
        .with_raw(escape)
}

#[derive(Clone, Copy)]
enum PatternShape {
    Contains,
    StartsWith,
    EndsWith,
}

fn pattern(
    ctx: &OperatorContext,
    field: Fragment,
    value: &FilterValue,
    shape: PatternShape,
    insensitive: bool,
    negated: bool,
) -> Result<Fragment> {
    let escaped = escape_like(&text_operand(value, "contains")?);
    let pattern = match shape {
        PatternShape::Contains => format!("%{escaped}%"),
        PatternShape::StartsWith => format!("{escaped}%"),
        PatternShape::EndsWith => format!("%{escaped}"),
    };
    let rhs = Fragment::param(pattern);
    let escape = ctx.like_escape_clause();
    if insensitive {
        return Ok(case_insensitive_like(ctx, field, rhs, negated, escape));
    }
    let keyword = if negated { " NOT LIKE " } else { " LIKE " };
    Ok(field.with_raw(keyword).then(rhs).with_raw(escape))
}

fn in_list(
    _: &OperatorContext,
    field: Fragment,
    value: &FilterValue,
    negated: bool,
) -> Result<Fragment> {
    let values: &[SqlValue] = match value {
        FilterValue::List(values) | FilterValue::Single(SqlValue::Array(values)) => values,
        FilterValue::Expr(subquery) => {
            let keyword = if negated { " NOT IN (" } else { " IN (" };
            return Ok(field.with_raw(keyword).then(subquery.clone()).with_raw(")"));
        }
        _ => {
            return Err(Error::invalid_argument(
                "operator `in` expects a list of values",
            ))
        }
    };
    if values.is_empty() {
        // Nothing is in the empty set.
        return Ok(Fragment::raw(if negated { "1=1" } else { "1=0" }));
    }
    let keyword = if negated { " NOT IN (" } else { " IN (" };
    let items = values.iter().map(|v| Fragment::param(v.clone()));
    Ok(field
        .with_raw(keyword)
        .then(Fragment::join(items, ", "))
        .with_raw(")"))
}

fn between(
    _: &OperatorContext,
    field: Fragment,
    value: &FilterValue,
    negated: bool,
) -> Result<Fragment> {
    let FilterValue::Range(low, high) = value else {
        return Err(Error::invalid_argument(
            "operator `between` expects a range",
        ));
    };
    let keyword = if negated { " NOT BETWEEN " } else { " BETWEEN " };
    Ok(field
        .with_raw(keyword)
        .with_param(low.clone())
        .with_raw(" AND ")
        .with_param(high.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryErrorKind;
    use crate::fragment::PlaceholderStyle;

    fn render(kind: DialectKind, op: &str, value: FilterValue) -> (String, Vec<SqlValue>) {
        let ctx = OperatorContext::for_kind(kind);
        let field = Fragment::raw(ctx.escape_identifier("name"));
        OperatorRegistry::standard()
            .render(op, &ctx, field, &value)
            .map(|f| f.render(kind.placeholder_style()))
            .unwrap_or_default()
    }

    #[test]
    fn aliases_resolve_to_same_handler() {
        let a = render(DialectKind::Postgres, "eq", FilterValue::single("x"));
        let b = render(DialectKind::Postgres, "equals", FilterValue::single("x"));
        assert_eq!(a, b);
        assert_eq!(a.0, r#""name" = $1"#);
    }

    #[test]
    fn unknown_operator_is_query_error() {
        let ctx = OperatorContext::for_kind(DialectKind::Sqlite);
        let err = OperatorRegistry::standard()
            .render("regex", &ctx, Fragment::raw("x"), &FilterValue::None)
            .err();
        assert_eq!(
            err.and_then(|e| e.query_kind()),
            Some(QueryErrorKind::UnknownOperator)
        );
    }

    #[test]
    fn empty_in_and_not_in() {
        for kind in [DialectKind::Postgres, DialectKind::MySql, DialectKind::Sqlite] {
            let (sql, params) = render(kind, "in", FilterValue::List(vec![]));
            assert_eq!(sql, "1=0");
            assert!(params.is_empty());
            let (sql, _) = render(kind, "notIn", FilterValue::List(vec![]));
            assert_eq!(sql, "1=1");
        }
    }

    #[test]
    fn in_list_params() {
        let (sql, params) = render(
            DialectKind::Postgres,
            "in",
            FilterValue::list([1_i64, 2, 3]),
        );
        assert_eq!(sql, r#""name" IN ($1, $2, $3)"#);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn contains_escapes_wildcards() {
        let (sql, params) = render(DialectKind::Sqlite, "contains", FilterValue::single("50%_off\\"));
        assert_eq!(sql, r#""name" LIKE ? ESCAPE '\'"#);
        assert_eq!(params, vec![SqlValue::Text("%50\\%\\_off\\\\%".into())]);

        let (sql, _) = render(DialectKind::MySql, "startsWith", FilterValue::single("a"));
        assert_eq!(sql, r"`name` LIKE ? ESCAPE '\\'");
    }

    #[test]
    fn ilike_fallback() {
        let (pg, _) = render(DialectKind::Postgres, "ilike", FilterValue::single("A%"));
        assert_eq!(pg, r#""name" ILIKE $1"#);
        let (my, _) = render(DialectKind::MySql, "ilike", FilterValue::single("A%"));
        assert_eq!(my, "LOWER(`name`) LIKE LOWER(?)");
        let (lite, _) = render(DialectKind::Sqlite, "notIlike", FilterValue::single("A%"));
        assert_eq!(lite, r#"LOWER("name") NOT LIKE LOWER(?)"#);
    }

    #[test]
    fn raw_like_keeps_pattern() {
        let (_, params) = render(DialectKind::Postgres, "like", FilterValue::single("a_%"));
        assert_eq!(params, vec![SqlValue::Text("a_%".into())]);
    }

    #[test]
    fn equals_null_becomes_is_null() {
        let (sql, params) = render(DialectKind::MySql, "eq", FilterValue::Single(SqlValue::Null));
        assert_eq!(sql, "`name` IS NULL");
        assert!(params.is_empty());
        let (sql, _) = render(DialectKind::MySql, "ne", FilterValue::Single(SqlValue::Null));
        assert_eq!(sql, "`name` IS NOT NULL");
    }

    #[test]
    fn between_binds_both_bounds() {
        let (sql, params) =
            render(DialectKind::Postgres, "between", FilterValue::range(1_i64, 5_i64));
        assert_eq!(sql, r#""name" BETWEEN $1 AND $2"#);
        assert_eq!(params, vec![SqlValue::Int(1), SqlValue::Int(5)]);
        let bad = OperatorRegistry::standard().render(
            "between",
            &OperatorContext::for_kind(DialectKind::Postgres),
            Fragment::raw("x"),
            &FilterValue::single(1_i64),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn custom_operator_registration() {
        let mut registry = OperatorRegistry::with_builtins();
        registry.register("regexp", |_, f, v| {
            let FilterValue::Single(value) = v else {
                return Err(Error::invalid_argument("regexp expects a value"));
            };
            Ok(f.with_raw(" REGEXP ").with_param(value.clone()))
        });
        registry.alias("re", "regexp");
        let ctx = OperatorContext::for_kind(DialectKind::MySql);
        let sql = registry
            .render("re", &ctx, Fragment::raw("`x`"), &FilterValue::single("^a"))
            .map(|f| f.sql(PlaceholderStyle::QuestionMark))
            .unwrap_or_default();
        assert_eq!(sql, "`x` REGEXP ?");
    }

    #[test]
    fn escape_identifier_doubles_quotes() {
        let ctx = OperatorContext::for_kind(DialectKind::Postgres);
        assert_eq!(ctx.escape_identifier("we\"ird"), r#""we""ird""#);
        let ctx = OperatorContext::for_kind(DialectKind::MySql);
        assert_eq!(ctx.escape_identifier("we`ird"), "`we``ird`");
    }
}
