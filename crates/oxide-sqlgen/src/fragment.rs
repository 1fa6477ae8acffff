//! SQL text with bound parameters.
//!
//! A [`Fragment`] keeps SQL text and parameter slots as separate parts, so
//! concatenation never has to renumber or re-escape anything. Placeholders
//! are produced exactly once, when the final statement is rendered for a
//! driver with [`Fragment::render`].

use std::fmt;

use crate::value::{SqlValue, ToSqlValue};

/// Placeholder convention of the target driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderStyle {
    /// `?` for every parameter (MySQL, SQLite).
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL).
    Dollar,
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Sql(String),
    Param(SqlValue),
}

/// An immutable piece of SQL text and its ordered parameters.
///
/// Values only ever enter a fragment through [`Fragment::param`] (or the
/// `push_param` family). Text enters through [`Fragment::raw`], which is
/// meant for trusted SQL written by this crate or explicitly by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    parts: Vec<Part>,
}

impl Fragment {
    /// Creates an empty fragment.
    #[must_use]
    pub const fn empty() -> Self {
        Self { parts: Vec::new() }
    }

    /// Creates a fragment from trusted SQL text.
    ///
    /// The text is inserted verbatim. Never pass user input here.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        if sql.is_empty() {
            return Self::empty();
        }
        Self {
            parts: vec![Part::Sql(sql)],
        }
    }

    /// Creates a fragment holding a single bound parameter.
    #[must_use]
    pub fn param<T: ToSqlValue>(value: T) -> Self {
        Self {
            parts: vec![Part::Param(value.to_sql_value())],
        }
    }

    /// Concatenates fragments in order.
    #[must_use]
    pub fn compose<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut out = Self::empty();
        for fragment in fragments {
            out.append(fragment);
        }
        out
    }

    /// Concatenates fragments with a raw separator between each pair.
    ///
    /// Empty fragments are skipped.
    #[must_use]
    pub fn join<I>(fragments: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut out = Self::empty();
        let mut first = true;
        for fragment in fragments {
            if fragment.is_empty() {
                continue;
            }
            if !first {
                out.push_raw(separator);
            }
            out.append(fragment);
            first = false;
        }
        out
    }

    /// Appends trusted SQL text.
    pub fn push_raw(&mut self, sql: &str) {
        if sql.is_empty() {
            return;
        }
        if let Some(Part::Sql(last)) = self.parts.last_mut() {
            last.push_str(sql);
        } else {
            self.parts.push(Part::Sql(String::from(sql)));
        }
    }

    /// Appends a bound parameter.
    pub fn push_param<T: ToSqlValue>(&mut self, value: T) {
        self.parts.push(Part::Param(value.to_sql_value()));
    }

    /// Appends another fragment, keeping its parameters in order.
    pub fn append(&mut self, other: Self) {
        for part in other.parts {
            match part {
                Part::Sql(sql) => self.push_raw(&sql),
                Part::Param(value) => self.parts.push(Part::Param(value)),
            }
        }
    }

    /// Builder form of [`Fragment::push_raw`].
    #[must_use]
    pub fn with_raw(mut self, sql: &str) -> Self {
        self.push_raw(sql);
        self
    }

    /// Builder form of [`Fragment::push_param`].
    #[must_use]
    pub fn with_param<T: ToSqlValue>(mut self, value: T) -> Self {
        self.push_param(value);
        self
    }

    /// Builder form of [`Fragment::append`].
    #[must_use]
    pub fn then(mut self, other: Self) -> Self {
        self.append(other);
        self
    }

    /// Wraps the fragment in parentheses.
    #[must_use]
    pub fn parens(self) -> Self {
        Self::raw("(").then(self).with_raw(")")
    }

    /// Returns `true` if the fragment holds neither text nor parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the bound parameters in order.
    #[must_use]
    pub fn params(&self) -> Vec<&SqlValue> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Param(value) => Some(value),
                Part::Sql(_) => None,
            })
            .collect()
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, Part::Param(_)))
            .count()
    }

    /// Renders the final SQL text and its parameters.
    #[must_use]
    pub fn render(&self, style: PlaceholderStyle) -> (String, Vec<SqlValue>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        for part in &self.parts {
            match part {
                Part::Sql(text) => sql.push_str(text),
                Part::Param(value) => {
                    params.push(value.clone());
                    match style {
                        PlaceholderStyle::QuestionMark => sql.push('?'),
                        PlaceholderStyle::Dollar => {
                            sql.push('$');
                            sql.push_str(&params.len().to_string());
                        }
                    }
                }
            }
        }
        (sql, params)
    }

    /// Renders only the SQL text.
    #[must_use]
    pub fn sql(&self, style: PlaceholderStyle) -> String {
        self.render(style).0
    }

    /// Renders the fragment with every parameter inlined as a literal.
    ///
    /// Used for DDL, where most engines reject bound parameters.
    #[must_use]
    pub fn to_inline_sql(&self) -> String {
        let mut sql = String::new();
        for part in &self.parts {
            match part {
                Part::Sql(text) => sql.push_str(text),
                Part::Param(value) => sql.push_str(&value.to_sql_inline()),
            }
        }
        sql
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql(PlaceholderStyle::QuestionMark))
    }
}

impl From<&str> for Fragment {
    fn from(sql: &str) -> Self {
        Self::raw(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_preserves_param_order() {
        let a = Fragment::raw("a = ").with_param(1_i64);
        let b = Fragment::raw(" AND b = ").with_param("x");
        let c = Fragment::raw(" AND c = ").with_param(true);
        let (sql, params) = Fragment::compose([a, b, c]).render(PlaceholderStyle::Dollar);
        assert_eq!(sql, "a = $1 AND b = $2 AND c = $3");
        assert_eq!(
            params,
            vec![
                SqlValue::Int(1),
                SqlValue::Text("x".into()),
                SqlValue::Bool(true)
            ]
        );
    }

    #[test]
    fn nested_composition_numbers_once() {
        let inner = Fragment::raw("x IN (")
            .with_param(1_i64)
            .with_raw(", ")
            .with_param(2_i64)
            .with_raw(")");
        let outer = Fragment::raw("SELECT * FROM t WHERE y = ")
            .with_param(0_i64)
            .with_raw(" AND ")
            .then(inner.parens());
        assert_eq!(
            outer.sql(PlaceholderStyle::Dollar),
            "SELECT * FROM t WHERE y = $1 AND (x IN ($2, $3))"
        );
        assert_eq!(
            outer.sql(PlaceholderStyle::QuestionMark),
            "SELECT * FROM t WHERE y = ? AND (x IN (?, ?))"
        );
    }

    #[test]
    fn raw_question_mark_is_not_a_placeholder() {
        let frag = Fragment::raw("data ? 'key' AND id = ").with_param(5_i64);
        assert_eq!(
            frag.sql(PlaceholderStyle::Dollar),
            "data ? 'key' AND id = $1"
        );
        assert_eq!(frag.param_count(), 1);
    }

    #[test]
    fn join_skips_empty() {
        let joined = Fragment::join(
            [Fragment::raw("a"), Fragment::empty(), Fragment::raw("b")],
            ", ",
        );
        assert_eq!(joined.to_string(), "a, b");
    }

    #[test]
    fn inline_rendering() {
        let frag = Fragment::raw("DEFAULT ").with_param("it's");
        assert_eq!(frag.to_inline_sql(), "DEFAULT 'it''s'");
    }

    #[test]
    fn empty_fragment() {
        assert!(Fragment::empty().is_empty());
        assert!(Fragment::raw("").is_empty());
        assert!(!Fragment::param(1_i64).is_empty());
    }
}
