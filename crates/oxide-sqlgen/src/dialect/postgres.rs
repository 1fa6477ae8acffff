//! PostgreSQL adapter.

use super::extensions::{PgVector, PostGis};
use super::{
    call, AdapterOptions, AggregateOps, ArrayOps, Capabilities, ClauseOps, CteOps, Dialect,
    DialectAdapter, DialectKind, ExpressionOps, GeoOps, JoinOps, JsonOps, MigrationDdl,
    MutationOps, OrderOps, PathSegment, RelationFilterOps, SetClauseOps, SetOps, SubqueryOps,
    Unsupported, VectorOps,
};
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::schema::{
    AlterColumnChange, ColumnSnapshot, DataType, Generated, SchemaSnapshot, TableSnapshot,
};
use crate::value::SqlValue;

const CAPABILITIES: Capabilities = Capabilities {
    supports_returning: true,
    supports_cte_with_mutations: true,
    supports_full_outer_join: true,
    supports_distinct_on: true,
    supports_ilike: true,
    supports_native_arrays: true,
    supports_transactional_ddl: true,
    supports_enum_types: true,
    supports_nulls_ordering: true,
};

static NO_VECTOR: Unsupported = Unsupported {
    dialect: "postgres",
    feature: "vector similarity",
    suggestion: "install pgvector and enable `extensions.vector`",
};

static NO_POSTGIS: Unsupported = Unsupported {
    dialect: "postgres",
    feature: "geospatial queries",
    suggestion: "install PostGIS and enable `extensions.postgis`",
};

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect {
    options: AdapterOptions,
}

impl PostgresDialect {
    /// Creates the dialect without extensions.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            options: AdapterOptions {
                vector: false,
                postgis: false,
            },
        }
    }

    /// Creates the dialect with the given extensions enabled.
    #[must_use]
    pub const fn with_options(options: AdapterOptions) -> Self {
        Self { options }
    }

    fn key_param(&self, key: &str) -> Fragment {
        Fragment::param(key)
    }

    fn path_chain(&self, column: Fragment, path: &[PathSegment], text_last: bool) -> Fragment {
        let mut out = column;
        for (i, segment) in path.iter().enumerate() {
            let op = if text_last && i + 1 == path.len() { " ->> " } else { " -> " };
            out.push_raw(op);
            match segment {
                PathSegment::Key(key) => out.append(self.key_param(key)),
                PathSegment::Index(idx) => out.push_raw(&idx.to_string()),
            }
        }
        out.parens()
    }
}

/// Element type used to cast a bound list.
fn array_cast(values: &[SqlValue]) -> &'static str {
    match values.iter().find(|v| !v.is_null()) {
        Some(SqlValue::Int(_)) => "::bigint[]",
        Some(SqlValue::Float(_)) => "::double precision[]",
        Some(SqlValue::Bool(_)) => "::boolean[]",
        Some(SqlValue::Json(_)) => "::jsonb[]",
        Some(SqlValue::Blob(_)) => "::bytea[]",
        _ => "::text[]",
    }
}

/// Text form of a path for `jsonb_set`: `{a,0,b}`.
fn text_array_path(path: &[PathSegment]) -> String {
    let items: Vec<String> = path
        .iter()
        .map(|s| match s {
            PathSegment::Key(k) => format!("\"{}\"", k.replace('\\', "\\\\").replace('"', "\\\"")),
            PathSegment::Index(i) => i.to_string(),
        })
        .collect();
    format!("{{{}}}", items.join(","))
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn value(&self, value: SqlValue) -> Fragment {
        match value {
            SqlValue::Json(doc) => Fragment::param(doc.to_string()).with_raw("::jsonb"),
            SqlValue::Array(items) => {
                let cast = array_cast(&items);
                Fragment::param(SqlValue::Array(items)).with_raw(cast)
            }
            other => Fragment::param(other),
        }
    }
}

impl ExpressionOps for PostgresDialect {
    fn cast_type(&self, data_type: &DataType) -> Result<String> {
        self.map_data_type(data_type)
    }
}

impl AggregateOps for PostgresDialect {
    fn json_agg(&self, x: Fragment) -> Fragment {
        call("json_agg", vec![x])
    }

    fn string_agg(&self, x: Fragment, separator: &str) -> Fragment {
        call("string_agg", vec![x, Fragment::param(separator)])
    }
}

impl JsonOps for PostgresDialect {
    fn json_get(&self, column: Fragment, path: &[PathSegment]) -> Fragment {
        if path.is_empty() {
            return column;
        }
        self.path_chain(column, path, false)
    }

    fn json_get_text(&self, column: Fragment, path: &[PathSegment]) -> Fragment {
        if path.is_empty() {
            return column.with_raw(" #>> '{}'").parens();
        }
        self.path_chain(column, path, true)
    }

    fn json_contains(&self, column: Fragment, value: &serde_json::Value) -> Result<Fragment> {
        Ok(column.with_raw(" @> ").then(self.value(SqlValue::Json(value.clone()))).parens())
    }

    fn json_has_key(&self, column: Fragment, key: &str) -> Fragment {
        column.with_raw(" ? ").then(self.key_param(key)).parens()
    }

    fn json_array_length(&self, column: Fragment) -> Fragment {
        call("jsonb_array_length", vec![column])
    }

    fn json_set(
        &self,
        column: Fragment,
        path: &[PathSegment],
        value: SqlValue,
    ) -> Result<Fragment> {
        if path.is_empty() {
            return Err(Error::invalid_argument("json_set needs a non-empty path"));
        }
        Ok(call(
            "jsonb_set",
            vec![
                column,
                Fragment::param(text_array_path(path)).with_raw("::text[]"),
                self.value(SqlValue::Json(value.to_json())),
            ],
        ))
    }
}

impl ArrayOps for PostgresDialect {
    fn array_has(&self, column: Fragment, value: SqlValue) -> Fragment {
        Fragment::param(value).with_raw(" = ANY(").then(column).with_raw(")")
    }

    fn array_has_every(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment {
        column.with_raw(" @> ").then(self.value(SqlValue::Array(values))).parens()
    }

    fn array_has_some(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment {
        column.with_raw(" && ").then(self.value(SqlValue::Array(values))).parens()
    }

    fn array_is_empty(&self, column: Fragment) -> Fragment {
        call("COALESCE", vec![call("cardinality", vec![column]), Fragment::raw("0")])
            .with_raw(" = 0")
    }

    fn array_length(&self, column: Fragment) -> Fragment {
        call("cardinality", vec![column])
    }

    fn array_get(&self, column: Fragment, index: usize) -> Fragment {
        column.parens().with_raw(&format!("[{}]", index + 1))
    }
}

impl OrderOps for PostgresDialect {}

impl ClauseOps for PostgresDialect {
    fn distinct_on(&self, columns: Vec<Fragment>) -> Result<Fragment> {
        Ok(Fragment::raw("DISTINCT ON ").then(Fragment::join(columns, ", ").parens()))
    }
}

impl SetClauseOps for PostgresDialect {
    fn array_push(&self, column: &str, value: SqlValue) -> Fragment {
        self.assign_expr(
            column,
            call("array_append", vec![self.identifier(column), Fragment::param(value)]),
        )
    }

    fn array_set(&self, column: &str, index: usize, value: SqlValue) -> Fragment {
        self.identifier(column)
            .with_raw(&format!("[{}] = ", index + 1))
            .then(Fragment::param(value))
    }
}

impl RelationFilterOps for PostgresDialect {}

impl SubqueryOps for PostgresDialect {}

impl CteOps for PostgresDialect {
    fn materialization(&self, materialized: Option<bool>) -> &'static str {
        match materialized {
            Some(true) => "MATERIALIZED ",
            Some(false) => "NOT MATERIALIZED ",
            None => "",
        }
    }
}

impl MutationOps for PostgresDialect {
    fn last_insert_id(&self) -> Fragment {
        Fragment::raw("lastval()")
    }
}

impl JoinOps for PostgresDialect {}

impl SetOps for PostgresDialect {}

impl MigrationDdl for PostgresDialect {
    fn map_data_type(&self, data_type: &DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Smallint => String::from("SMALLINT"),
            DataType::Integer => String::from("INTEGER"),
            DataType::Bigint => String::from("BIGINT"),
            DataType::Real => String::from("REAL"),
            DataType::Double => String::from("DOUBLE PRECISION"),
            DataType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("NUMERIC({p}, {s})"),
                (Some(p), None) => format!("NUMERIC({p})"),
                _ => String::from("NUMERIC"),
            },
            DataType::Char(len) => format!("CHAR({})", len.unwrap_or(1)),
            DataType::Varchar(len) => {
                len.map_or_else(|| String::from("VARCHAR"), |n| format!("VARCHAR({n})"))
            }
            DataType::Text | DataType::InlineEnum(_) => String::from("TEXT"),
            DataType::Blob => String::from("BYTEA"),
            DataType::Date => String::from("DATE"),
            DataType::Time => String::from("TIME"),
            DataType::Timestamp => String::from("TIMESTAMP"),
            DataType::TimestampTz => String::from("TIMESTAMPTZ"),
            DataType::Boolean => String::from("BOOLEAN"),
            DataType::Json => String::from("JSONB"),
            DataType::Uuid => String::from("UUID"),
            DataType::Array(inner) => format!("{}[]", self.map_data_type(inner)?),
            DataType::Enum(name) => self.escape_identifier(name),
            DataType::Vector(dim) => {
                if !self.options.vector {
                    return Err(NO_VECTOR.error("map_data_type"));
                }
                format!("vector({dim})")
            }
            DataType::Geometry => {
                if !self.options.postgis {
                    return Err(NO_POSTGIS.error("map_data_type"));
                }
                String::from("geometry")
            }
            DataType::Custom(name) => name.clone(),
        })
    }

    fn column_type(&self, column: &ColumnSnapshot) -> Result<String> {
        if column.generated == Some(Generated::Autoincrement) {
            return Ok(String::from(match column.data_type {
                DataType::Smallint => "SMALLSERIAL",
                DataType::Bigint => "BIGSERIAL",
                _ => "SERIAL",
            }));
        }
        self.map_data_type(&column.data_type)
    }

    fn generated_clause(&self, column: &ColumnSnapshot) -> Option<String> {
        match column.generated {
            Some(Generated::IdentityAlways) => Some(String::from("GENERATED ALWAYS AS IDENTITY")),
            Some(Generated::IdentityByDefault) => {
                Some(String::from("GENERATED BY DEFAULT AS IDENTITY"))
            }
            _ => None,
        }
    }

    fn alter_column(
        &self,
        table: &TableSnapshot,
        column: &ColumnSnapshot,
        changes: &[AlterColumnChange],
    ) -> Result<Vec<Fragment>> {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.escape_identifier(&table.name),
            self.escape_identifier(&column.name)
        );
        let name = self.escape_identifier(&column.name);
        let mut out = Vec::new();
        for change in changes {
            match change {
                AlterColumnChange::Type => {
                    let ty = self.map_data_type(&column.data_type)?;
                    let using = if matches!(column.data_type, DataType::Enum(_)) {
                        format!("{name}::text::{ty}")
                    } else {
                        format!("{name}::{ty}")
                    };
                    out.push(Fragment::raw(format!("{prefix} SET DATA TYPE {ty} USING {using}")));
                }
                AlterColumnChange::Nullable => {
                    let action = if column.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
                    out.push(Fragment::raw(format!("{prefix} {action}")));
                }
                AlterColumnChange::Default => match &column.default {
                    Some(default) => out.push(Fragment::raw(format!(
                        "{prefix} SET DEFAULT {}",
                        self.render_default(default)
                    ))),
                    None => out.push(Fragment::raw(format!("{prefix} DROP DEFAULT"))),
                },
                AlterColumnChange::Generated => match column.generated {
                    None => {
                        out.push(Fragment::raw(format!("{prefix} DROP IDENTITY IF EXISTS")));
                        out.push(Fragment::raw(format!("{prefix} DROP DEFAULT")));
                    }
                    Some(Generated::Autoincrement) => {
                        let sequence = self.escape_identifier(&format!("{}_{}_seq", table.name, column.name));
                        out.push(Fragment::raw(format!("{prefix} DROP IDENTITY IF EXISTS")));
                        out.push(Fragment::raw(format!(
                            "CREATE SEQUENCE IF NOT EXISTS {sequence} OWNED BY {}.{name}",
                            self.escape_identifier(&table.name)
                        )));
                        out.push(Fragment::raw(format!(
                            "{prefix} SET DEFAULT nextval('{}')",
                            sequence.replace('\'', "''")
                        )));
                    }
                    Some(kind) => {
                        let clause = if kind == Generated::IdentityAlways {
                            "ALWAYS"
                        } else {
                            "BY DEFAULT"
                        };
                        out.push(Fragment::raw(format!("{prefix} DROP DEFAULT")));
                        out.push(Fragment::raw(format!("{prefix} DROP IDENTITY IF EXISTS")));
                        out.push(Fragment::raw(format!(
                            "{prefix} ADD GENERATED {clause} AS IDENTITY"
                        )));
                    }
                },
            }
        }
        Ok(out)
    }

    fn create_enum(&self, name: &str, values: &[String]) -> Vec<Fragment> {
        vec![Fragment::raw(format!(
            "CREATE TYPE {} AS ENUM ({})",
            self.escape_identifier(name),
            quote_values(values)
        ))]
    }

    fn drop_enum(&self, name: &str) -> Vec<Fragment> {
        vec![Fragment::raw(format!("DROP TYPE {}", self.escape_identifier(name)))]
    }

    fn alter_enum(
        &self,
        name: &str,
        added: &[String],
        removed: &[String],
        values: &[String],
        desired: &SchemaSnapshot,
    ) -> Result<Vec<Fragment>> {
        let ty = self.escape_identifier(name);
        if removed.is_empty() {
            return Ok(added
                .iter()
                .map(|v| {
                    Fragment::raw(format!(
                        "ALTER TYPE {ty} ADD VALUE IF NOT EXISTS '{}'",
                        v.replace('\'', "''")
                    ))
                })
                .collect());
        }

        // Values cannot be removed from a PostgreSQL enum: recreate the
        // type and move every column over.
        let old = self.escape_identifier(&format!("{name}_old"));
        let mut out = vec![Fragment::raw(format!("ALTER TYPE {ty} RENAME TO {old}"))];
        out.extend(self.create_enum(name, values));
        for table in desired.tables.values() {
            for column in &table.columns {
                let (target, via) = match &column.data_type {
                    DataType::Enum(n) if n == name => (ty.clone(), "text"),
                    DataType::Array(inner) if **inner == DataType::Enum(String::from(name)) => {
                        (format!("{ty}[]"), "text[]")
                    }
                    _ => continue,
                };
                let prefix = format!(
                    "ALTER TABLE {} ALTER COLUMN {}",
                    self.escape_identifier(&table.name),
                    self.escape_identifier(&column.name)
                );
                if column.default.is_some() {
                    out.push(Fragment::raw(format!("{prefix} DROP DEFAULT")));
                }
                out.push(Fragment::raw(format!(
                    "{prefix} TYPE {target} USING {}::{via}::{target}",
                    self.escape_identifier(&column.name)
                )));
                if let Some(default) = &column.default {
                    out.push(Fragment::raw(format!(
                        "{prefix} SET DEFAULT {}",
                        self.render_default(default)
                    )));
                }
            }
        }
        out.push(Fragment::raw(format!("DROP TYPE {old}")));
        Ok(out)
    }

    fn drop_all(&self, current: &SchemaSnapshot) -> Vec<Fragment> {
        let mut out: Vec<Fragment> = current
            .tables
            .keys()
            .map(|t| {
                Fragment::raw(format!(
                    "DROP TABLE IF EXISTS {} CASCADE",
                    self.escape_identifier(t)
                ))
            })
            .collect();
        out.extend(current.enums.keys().map(|e| {
            Fragment::raw(format!("DROP TYPE IF EXISTS {} CASCADE", self.escape_identifier(e)))
        }));
        out
    }
}

fn quote_values(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DialectAdapter for PostgresDialect {
    fn vector(&self) -> &dyn VectorOps {
        if self.options.vector {
            &PgVector
        } else {
            &NO_VECTOR
        }
    }

    fn geo(&self) -> &dyn GeoOps {
        if self.options.postgis {
            &PostGis
        } else {
            &NO_POSTGIS
        }
    }
}
