//! Column data types and default values.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Dialect-neutral column types.
///
/// Each dialect maps these onto its own type names when rendering DDL
/// (see [`crate::dialect::MigrationDdl::map_data_type`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    // Integer types
    /// Small integer (2 bytes).
    Smallint,
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,

    // Floating point
    /// Real (4-byte float).
    Real,
    /// Double precision (8-byte float).
    Double,
    /// Exact numeric with precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u16>,
        /// Number of digits after decimal point.
        scale: Option<u16>,
    },

    // String types
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Text (variable length, no limit).
    Text,

    /// Binary large object.
    Blob,

    // Date/time types
    Date,
    Time,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone.
    TimestampTz,

    Boolean,
    Json,
    Uuid,

    /// List of another type. Native on PostgreSQL, JSON elsewhere.
    Array(Box<DataType>),
    /// Reference to a named enum of the schema.
    Enum(String),
    /// Enum declared inline on the column (MySQL style).
    InlineEnum(Vec<String>),

    /// Fixed-dimension embedding vector (pgvector).
    Vector(u32),
    /// Geometry column (PostGIS, MySQL spatial).
    Geometry,

    /// Database-specific type, rendered verbatim.
    Custom(String),
}

impl DataType {
    /// Returns `true` for the integer family.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Smallint | Self::Integer | Self::Bigint)
    }

    /// Short dialect-neutral label, used in reports.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Smallint => String::from("smallint"),
            Self::Integer => String::from("integer"),
            Self::Bigint => String::from("bigint"),
            Self::Real => String::from("real"),
            Self::Double => String::from("double"),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("decimal({p}, {s})"),
                (Some(p), None) => format!("decimal({p})"),
                _ => String::from("decimal"),
            },
            Self::Char(len) => len.map_or_else(|| String::from("char"), |n| format!("char({n})")),
            Self::Varchar(len) => {
                len.map_or_else(|| String::from("varchar"), |n| format!("varchar({n})"))
            }
            Self::Text => String::from("text"),
            Self::Blob => String::from("blob"),
            Self::Date => String::from("date"),
            Self::Time => String::from("time"),
            Self::Timestamp => String::from("timestamp"),
            Self::TimestampTz => String::from("timestamptz"),
            Self::Boolean => String::from("boolean"),
            Self::Json => String::from("json"),
            Self::Uuid => String::from("uuid"),
            Self::Array(inner) => format!("{}[]", inner.label()),
            Self::Enum(name) => format!("enum {name}"),
            Self::InlineEnum(values) => format!("enum({})", values.join(", ")),
            Self::Vector(dim) => format!("vector({dim})"),
            Self::Geometry => String::from("geometry"),
            Self::Custom(name) => name.clone(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses the action name reported by catalogs.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" | "A" => Some(Self::NoAction),
            "RESTRICT" | "R" => Some(Self::Restrict),
            "CASCADE" | "C" => Some(Self::Cascade),
            "SET NULL" | "N" => Some(Self::SetNull),
            "SET DEFAULT" | "D" => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// Column default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Raw SQL expression (e.g., `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of the default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Boolean(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Integer(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        }
    }

    /// Parses a default as reported by a database catalog.
    ///
    /// Handles quoted strings, PostgreSQL `::type` casts, numbers and
    /// boolean keywords; anything else is kept as an expression.
    #[must_use]
    pub fn parse_sql(text: &str) -> Self {
        let mut text = text.trim();
        while text.starts_with('(') && text.ends_with(')') && text.len() >= 2 {
            text = text[1..text.len() - 1].trim();
        }
        if let Some(stripped) = strip_pg_cast(text) {
            text = stripped;
        }
        if text.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if text.eq_ignore_ascii_case("true") {
            return Self::Boolean(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Self::Boolean(false);
        }
        if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            return Self::String(text[1..text.len() - 1].replace("''", "'"));
        }
        if let Ok(n) = text.parse::<i64>() {
            return Self::Integer(n);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Self::Float(f);
        }
        Self::Expression(String::from(text))
    }

    /// Compares two defaults the way databases store them.
    ///
    /// Booleans equal their integer form and expressions compare
    /// case-insensitively, with `now()` and `CURRENT_TIMESTAMP` equal.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(b), Self::Integer(n)) | (Self::Integer(n), Self::Boolean(b)) => {
                i64::from(*b) == *n
            }
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                #[allow(clippy::cast_precision_loss)]
                let a = *a as f64;
                (a - b).abs() < f64::EPSILON
            }
            (Self::Expression(a), Self::Expression(b)) => {
                normalize_expression(a) == normalize_expression(b)
            }
            (Self::String(a), Self::Expression(b)) | (Self::Expression(b), Self::String(a)) => {
                a == b
            }
            _ => self == other,
        }
    }
}

fn strip_pg_cast(text: &str) -> Option<&str> {
    if !text.starts_with('\'') {
        return None;
    }
    let idx = text.rfind("'::")?;
    Some(&text[..=idx])
}

fn normalize_expression(expr: &str) -> String {
    let lower = expr.trim().to_ascii_lowercase();
    match lower.as_str() {
        "now()" | "current_timestamp()" | "current_timestamp" => String::from("current_timestamp"),
        _ => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parse_sql() {
        assert_eq!(DefaultValue::parse_sql("0"), DefaultValue::Integer(0));
        assert_eq!(
            DefaultValue::parse_sql("'active'::character varying"),
            DefaultValue::String("active".into())
        );
        assert_eq!(
            DefaultValue::parse_sql("'it''s'"),
            DefaultValue::String("it's".into())
        );
        assert_eq!(DefaultValue::parse_sql("true"), DefaultValue::Boolean(true));
        assert_eq!(DefaultValue::parse_sql("NULL"), DefaultValue::Null);
        assert_eq!(DefaultValue::parse_sql("(1.5)"), DefaultValue::Float(1.5));
        assert_eq!(
            DefaultValue::parse_sql("CURRENT_TIMESTAMP"),
            DefaultValue::Expression("CURRENT_TIMESTAMP".into())
        );
    }

    #[test]
    fn default_equivalence() {
        assert!(DefaultValue::Boolean(true).equivalent(&DefaultValue::Integer(1)));
        assert!(!DefaultValue::Boolean(false).equivalent(&DefaultValue::Integer(1)));
        assert!(DefaultValue::Expression("now()".into())
            .equivalent(&DefaultValue::Expression("CURRENT_TIMESTAMP".into())));
        assert!(!DefaultValue::String("a".into()).equivalent(&DefaultValue::String("b".into())));
    }

    #[test]
    fn default_to_sql_escapes_quotes() {
        assert_eq!(DefaultValue::String("O'Brien".into()).to_sql(), "'O''Brien'");
        assert_eq!(DefaultValue::Boolean(false).to_sql(), "FALSE");
    }

    #[test]
    fn data_type_label() {
        assert_eq!(DataType::Varchar(Some(255)).label(), "varchar(255)");
        assert_eq!(DataType::Array(Box::new(DataType::Text)).label(), "text[]");
        assert_eq!(
            DataType::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
            .label(),
            "decimal(10, 2)"
        );
    }

    #[test]
    fn data_type_serde() {
        let json = serde_json::to_string(&DataType::Varchar(Some(40))).unwrap_or_default();
        assert_eq!(json, r#"{"varchar":40}"#);
        let parsed: DataType = serde_json::from_str(r#""integer""#).unwrap_or(DataType::Text);
        assert_eq!(parsed, DataType::Integer);
    }

    #[test]
    fn fk_action_parse() {
        assert_eq!(ForeignKeyAction::parse("CASCADE"), Some(ForeignKeyAction::Cascade));
        assert_eq!(ForeignKeyAction::parse("n"), Some(ForeignKeyAction::SetNull));
        assert_eq!(ForeignKeyAction::parse("bogus"), None);
    }
}
