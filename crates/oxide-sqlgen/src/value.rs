//! SQL values and parameter handling.
//!
//! Every user-supplied value reaches SQL text as a bound parameter. The
//! only place a value is ever inlined is [`SqlValue::to_sql_inline`], which
//! DDL rendering uses for column defaults.

use serde::{Deserialize, Serialize};

/// A SQL value that can be used as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// JSON document.
    Json(serde_json::Value),
    /// List value. Bound natively on PostgreSQL, as JSON text elsewhere.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Renders the value as an escaped SQL literal.
    ///
    /// Only DDL defaults and dry-run output go through here; query values
    /// are always bound.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(true) => String::from("TRUE"),
            Self::Bool(false) => String::from("FALSE"),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Text(text) => single_quoted(text),
            Self::Blob(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Json(_) | Self::Array(_) => single_quoted(&self.to_json().to_string()),
        }
    }

    /// The value as a JSON document. Lists are stored this way where the
    /// database has no native arrays.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(x) => Value::from(*x),
            Self::Text(text) => Value::String(text.clone()),
            Self::Blob(bytes) => bytes.iter().copied().map(Value::from).collect(),
            Self::Json(doc) => doc.clone(),
            Self::Array(items) => items.iter().map(Self::to_json).collect(),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short label used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Json(_) => "json",
            Self::Array(_) => "array",
        }
    }
}

fn single_quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Conversion of Rust values into bound parameters.
pub trait ToSqlValue {
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

macro_rules! sql_value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::$variant(self.into())
                }
            }

            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    value.to_sql_value()
                }
            }
        )*
    };
}

sql_value_conversions!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    Vec<u8> => Blob,
    serde_json::Value => Json,
);

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        value.to_sql_value()
    }
}
