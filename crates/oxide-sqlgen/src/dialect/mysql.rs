//! MySQL adapter.
//!
//! MySQL has no RETURNING, DISTINCT ON, FULL JOIN, native arrays or
//! named enum types. Lists are stored as JSON arrays and manipulated with
//! the JSON functions; named enums are normalized to inline `ENUM(...)`
//! columns before diffing.

use super::ddl::{constraint_name, SessionGuard};
use super::extensions::MySqlSpatial;
use super::{
    call, json_path, AggregateOps, ArrayOps, Capabilities, ClauseOps, CteOps, Dialect,
    DialectAdapter, DialectKind, ExpressionOps, GeoOps, JoinOps, JsonOps, MigrationDdl,
    MutationOps, OrderOps, PathSegment, RelationFilterOps, SetClauseOps, SetOps, SubqueryOps,
    Unsupported, VectorOps,
};
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::mutation::{ConflictAction, Upsert};
use crate::query::{NullsOrder, SortDirection};
use crate::schema::{
    AlterColumnChange, ColumnSnapshot, DataType, ForeignKeySnapshot, PrimaryKey, SchemaSnapshot,
    TableSnapshot, UniqueConstraint,
};
use crate::value::SqlValue;

const CAPABILITIES: Capabilities = Capabilities {
    supports_returning: false,
    supports_cte_with_mutations: false,
    supports_full_outer_join: false,
    supports_distinct_on: false,
    supports_ilike: false,
    supports_native_arrays: false,
    supports_transactional_ddl: false,
    supports_enum_types: false,
    supports_nulls_ordering: false,
};

static NO_VECTOR: Unsupported = Unsupported {
    dialect: "mysql",
    feature: "vector similarity",
    suggestion: "use PostgreSQL with pgvector",
};

/// Largest LIMIT MySQL accepts; stands in for "no limit".
const UNBOUNDED_LIMIT: u64 = u64::MAX;

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn json_param(value: &SqlValue) -> Fragment {
        Fragment::param(value.to_json().to_string())
    }

    fn path_param(path: &[PathSegment]) -> Fragment {
        Fragment::param(json_path(path))
    }
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    /// Backslashes are escapes inside MySQL string literals.
    fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
            other => other.to_sql_inline(),
        }
    }

    fn value(&self, value: SqlValue) -> Fragment {
        match value {
            SqlValue::Json(_) | SqlValue::Array(_) => Self::json_param(&value),
            other => Fragment::param(other),
        }
    }
}

impl ExpressionOps for MySqlDialect {
    fn concat(&self, parts: Vec<Fragment>) -> Fragment {
        call("CONCAT", parts)
    }

    fn now(&self) -> Fragment {
        Fragment::raw("NOW()")
    }

    fn cast_type(&self, data_type: &DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Smallint | DataType::Integer | DataType::Bigint | DataType::Boolean => {
                String::from("SIGNED")
            }
            DataType::Real | DataType::Double => String::from("DOUBLE"),
            DataType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => String::from("DECIMAL"),
            },
            DataType::Char(_)
            | DataType::Varchar(_)
            | DataType::Text
            | DataType::Uuid
            | DataType::Enum(_)
            | DataType::InlineEnum(_) => String::from("CHAR"),
            DataType::Blob => String::from("BINARY"),
            DataType::Date => String::from("DATE"),
            DataType::Time => String::from("TIME"),
            DataType::Timestamp | DataType::TimestampTz => String::from("DATETIME"),
            DataType::Json | DataType::Array(_) => String::from("JSON"),
            other => {
                return Err(self.unsupported(
                    &format!("CAST to {other}"),
                    "cast",
                    "cast to CHAR and convert in the application",
                ))
            }
        })
    }
}

impl AggregateOps for MySqlDialect {
    fn json_agg(&self, x: Fragment) -> Fragment {
        call("JSON_ARRAYAGG", vec![x])
    }

    fn string_agg(&self, x: Fragment, separator: &str) -> Fragment {
        let sep = self.literal(&SqlValue::Text(String::from(separator)));
        Fragment::raw("GROUP_CONCAT(")
            .then(x)
            .with_raw(&format!(" SEPARATOR {sep})"))
    }
}

impl JsonOps for MySqlDialect {
    fn json_get(&self, column: Fragment, path: &[PathSegment]) -> Fragment {
        call("JSON_EXTRACT", vec![column, Self::path_param(path)])
    }

    fn json_get_text(&self, column: Fragment, path: &[PathSegment]) -> Fragment {
        call("JSON_UNQUOTE", vec![self.json_get(column, path)])
    }

    fn json_contains(&self, column: Fragment, value: &serde_json::Value) -> Result<Fragment> {
        Ok(call(
            "JSON_CONTAINS",
            vec![column, Fragment::param(value.to_string())],
        ))
    }

    fn json_has_key(&self, column: Fragment, key: &str) -> Fragment {
        call(
            "JSON_CONTAINS_PATH",
            vec![column, Fragment::raw("'one'"), Self::path_param(&[key.into()])],
        )
    }

    fn json_array_length(&self, column: Fragment) -> Fragment {
        call("JSON_LENGTH", vec![column])
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
            "JSON_SET",
            vec![
                column,
                Self::path_param(path),
                Fragment::raw("CAST(")
                    .then(Self::json_param(&value))
                    .with_raw(" AS JSON)"),
            ],
        ))
    }
}

impl ArrayOps for MySqlDialect {
    fn array_has(&self, column: Fragment, value: SqlValue) -> Fragment {
        call("JSON_CONTAINS", vec![column, Self::json_param(&value)])
    }

    fn array_has_every(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment {
        call(
            "JSON_CONTAINS",
            vec![column, Self::json_param(&SqlValue::Array(values))],
        )
    }

    fn array_has_some(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment {
        call(
            "JSON_OVERLAPS",
            vec![column, Self::json_param(&SqlValue::Array(values))],
        )
    }

    fn array_is_empty(&self, column: Fragment) -> Fragment {
        call(
            "COALESCE",
            vec![call("JSON_LENGTH", vec![column]), Fragment::raw("0")],
        )
        .with_raw(" = 0")
    }

    fn array_length(&self, column: Fragment) -> Fragment {
        call("JSON_LENGTH", vec![column])
    }

    fn array_get(&self, column: Fragment, index: usize) -> Fragment {
        call("JSON_EXTRACT", vec![column, Fragment::raw(format!("'$[{index}]'"))])
    }
}

impl OrderOps for MySqlDialect {
    /// NULLS FIRST / LAST become a leading `x IS NULL` key.
    fn order_item(
        &self,
        expr: Fragment,
        direction: SortDirection,
        nulls: Option<NullsOrder>,
    ) -> Fragment {
        let item = expr.clone().with_raw(" ").with_raw(direction.as_sql());
        match nulls {
            None => item,
            Some(order) => {
                let key = match order {
                    NullsOrder::First => " IS NULL DESC, ",
                    NullsOrder::Last => " IS NULL ASC, ",
                };
                expr.with_raw(key).then(item)
            }
        }
    }
}

impl ClauseOps for MySqlDialect {
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Fragment {
        match (limit, offset) {
            (None, Some(offset)) => {
                Fragment::raw(format!("LIMIT {UNBOUNDED_LIMIT} OFFSET {offset}"))
            }
            (Some(limit), Some(offset)) => Fragment::raw(format!("LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => Fragment::raw(format!("LIMIT {limit}")),
            (None, None) => Fragment::empty(),
        }
    }
}

impl SetClauseOps for MySqlDialect {
    fn array_push(&self, column: &str, value: SqlValue) -> Fragment {
        let current = call(
            "COALESCE",
            vec![self.identifier(column), Fragment::raw("JSON_ARRAY()")],
        );
        self.assign_expr(
            column,
            call(
                "JSON_ARRAY_APPEND",
                vec![current, Fragment::raw("'$'"), Fragment::param(value)],
            ),
        )
    }

    fn array_set(&self, column: &str, index: usize, value: SqlValue) -> Fragment {
        self.assign_expr(
            column,
            call(
                "JSON_SET",
                vec![
                    self.identifier(column),
                    Fragment::raw(format!("'$[{index}]'")),
                    Fragment::param(value),
                ],
            ),
        )
    }
}

impl RelationFilterOps for MySqlDialect {}

impl SubqueryOps for MySqlDialect {}

impl CteOps for MySqlDialect {}

impl MutationOps for MySqlDialect {
    fn default_values(&self) -> &'static str {
        "() VALUES ()"
    }

    /// `ON DUPLICATE KEY UPDATE`; the conflict target is ignored since
    /// MySQL reacts to any unique key.
    fn upsert(&self, upsert: &Upsert) -> Result<Fragment> {
        let sql = self.insert_values(&upsert.insert)?;
        let sets: Vec<Fragment> = match &upsert.action {
            ConflictAction::Update(columns) => {
                if columns.is_empty() {
                    return Err(Error::invalid_argument("upsert without update columns"));
                }
                columns
                    .iter()
                    .map(|c| {
                        self.identifier(c)
                            .with_raw(" = VALUES(")
                            .then(self.identifier(c))
                            .with_raw(")")
                    })
                    .collect()
            }
            ConflictAction::DoNothing => {
                let first = upsert
                    .insert
                    .columns
                    .first()
                    .ok_or_else(|| Error::invalid_argument("upsert without columns"))?;
                vec![self.identifier(first).with_raw(" = ").then(self.identifier(first))]
            }
        };
        Ok(sql
            .with_raw(" ON DUPLICATE KEY UPDATE ")
            .then(Fragment::join(sets, ", ")))
    }

    fn last_insert_id(&self) -> Fragment {
        Fragment::raw("LAST_INSERT_ID()")
    }
}

impl JoinOps for MySqlDialect {}

impl SetOps for MySqlDialect {}

impl MigrationDdl for MySqlDialect {
    fn map_data_type(&self, data_type: &DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Smallint => String::from("SMALLINT"),
            DataType::Integer => String::from("INT"),
            DataType::Bigint => String::from("BIGINT"),
            DataType::Real => String::from("FLOAT"),
            DataType::Double => String::from("DOUBLE"),
            DataType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => String::from("DECIMAL"),
            },
            DataType::Char(len) => format!("CHAR({})", len.unwrap_or(1)),
            DataType::Varchar(len) => format!("VARCHAR({})", len.unwrap_or(255)),
            DataType::Text => String::from("TEXT"),
            DataType::Blob => String::from("BLOB"),
            DataType::Date => String::from("DATE"),
            DataType::Time => String::from("TIME"),
            DataType::Timestamp => String::from("DATETIME"),
            DataType::TimestampTz => String::from("TIMESTAMP"),
            DataType::Boolean => String::from("TINYINT(1)"),
            DataType::Json | DataType::Array(_) => String::from("JSON"),
            DataType::Uuid => String::from("CHAR(36)"),
            DataType::InlineEnum(values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| self.literal(&SqlValue::Text(v.clone())))
                    .collect();
                format!("ENUM({})", quoted.join(", "))
            }
            DataType::Enum(name) => {
                return Err(self.unsupported(
                    &format!("named enum type `{name}`"),
                    "map_data_type",
                    "normalize the schema so enum values are declared inline",
                ))
            }
            DataType::Vector(_) => return Err(NO_VECTOR.error("map_data_type")),
            DataType::Geometry => String::from("GEOMETRY"),
            DataType::Custom(name) => name.clone(),
        })
    }

    fn generated_clause(&self, column: &ColumnSnapshot) -> Option<String> {
        column.generated.map(|_| String::from("AUTO_INCREMENT"))
    }

    fn rename_table(&self, from: &str, to: &str) -> Fragment {
        Fragment::raw(format!(
            "RENAME TABLE {} TO {}",
            self.escape_identifier(from),
            self.escape_identifier(to)
        ))
    }

    /// MySQL restates the whole column.
    fn alter_column(
        &self,
        table: &TableSnapshot,
        column: &ColumnSnapshot,
        changes: &[AlterColumnChange],
    ) -> Result<Vec<Fragment>> {
        let _ = changes;
        Ok(vec![Fragment::raw(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.escape_identifier(&table.name),
            self.column_definition(table, column)?
        ))])
    }

    fn drop_index(&self, table: &str, name: &str) -> Fragment {
        Fragment::raw(format!(
            "DROP INDEX {} ON {}",
            self.escape_identifier(name),
            self.escape_identifier(table)
        ))
    }

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKeySnapshot) -> Fragment {
        let name = fk
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &fk.columns, "fkey"));
        Fragment::raw(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.escape_identifier(table),
            self.escape_identifier(&name)
        ))
    }

    fn drop_unique(&self, table: &str, unique: &UniqueConstraint) -> Fragment {
        let name = unique
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &unique.columns, "key"));
        Fragment::raw(format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.escape_identifier(table),
            self.escape_identifier(&name)
        ))
    }

    fn add_primary_key(&self, table: &str, pk: &PrimaryKey) -> Fragment {
        Fragment::raw(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            self.escape_identifier(table),
            self.quote_list(&pk.columns)
        ))
    }

    fn drop_primary_key(&self, table: &str, _pk: &PrimaryKey) -> Fragment {
        Fragment::raw(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.escape_identifier(table)
        ))
    }

    /// Checks stay off only for a reset. The setting is per session, so
    /// `after` restores it even when a drop fails.
    fn session_guard(&self, reset: bool) -> SessionGuard {
        if !reset {
            return SessionGuard::default();
        }
        SessionGuard {
            before: vec![Fragment::raw("SET FOREIGN_KEY_CHECKS = 0")],
            check: None,
            after: vec![Fragment::raw("SET FOREIGN_KEY_CHECKS = 1")],
        }
    }

    fn drop_all(&self, current: &SchemaSnapshot) -> Vec<Fragment> {
        current
            .tables
            .keys()
            .map(|t| Fragment::raw(format!("DROP TABLE IF EXISTS {}", self.escape_identifier(t))))
            .collect()
    }
}

impl DialectAdapter for MySqlDialect {
    fn vector(&self) -> &dyn VectorOps {
        &NO_VECTOR
    }

    fn geo(&self) -> &dyn GeoOps {
        &MySqlSpatial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::Insert;

    fn my() -> MySqlDialect {
        MySqlDialect::new()
    }

    #[test]
    fn json_functions() {
        let d = my();
        let (sql, params) = d
            .json_get_text(d.identifier("data"), &["a".into(), 1_usize.into()])
            .render(crate::fragment::PlaceholderStyle::QuestionMark);
        assert_eq!(sql, "JSON_UNQUOTE(JSON_EXTRACT(`data`, ?))");
        assert_eq!(params, vec![SqlValue::Text(r#"$."a"[1]"#.into())]);
        assert_eq!(
            d.json_has_key(d.identifier("data"), "k").to_string(),
            "JSON_CONTAINS_PATH(`data`, 'one', ?)"
        );
    }

    #[test]
    fn arrays_are_json() {
        let d = my();
        let (sql, params) = d
            .array_has_every(d.identifier("tags"), vec!["a".into(), "b".into()])
            .render(crate::fragment::PlaceholderStyle::QuestionMark);
        assert_eq!(sql, "JSON_CONTAINS(`tags`, ?)");
        assert_eq!(params, vec![SqlValue::Text(r#"["a","b"]"#.into())]);
        assert_eq!(
            d.array_push("tags", "c".into()).to_string(),
            "`tags` = JSON_ARRAY_APPEND(COALESCE(`tags`, JSON_ARRAY()), '$', ?)"
        );
        assert_eq!(
            d.array_get(d.identifier("tags"), 2).to_string(),
            "JSON_EXTRACT(`tags`, '$[2]')"
        );
    }

    #[test]
    fn group_concat_separator_is_escaped() {
        let d = my();
        assert_eq!(
            d.string_agg(d.identifier("name"), "\\'").to_string(),
            "GROUP_CONCAT(`name` SEPARATOR '\\\\''')"
        );
    }

    #[test]
    fn upsert_requires_columns_for_ignore() {
        let upsert = Upsert::ignore_on(Insert::into("t"), &[]);
        assert!(my().upsert(&upsert).is_err());
    }

    #[test]
    fn ddl_differences() {
        let d = my();
        assert_eq!(
            d.rename_table("a", "b").to_inline_sql(),
            "RENAME TABLE `a` TO `b`"
        );
        assert_eq!(d.drop_index("t", "i").to_inline_sql(), "DROP INDEX `i` ON `t`");
        let table = TableSnapshot::new("t");
        let out = d
            .alter_column(
                &table,
                &ColumnSnapshot::new("n", DataType::Bigint).not_null(),
                &[AlterColumnChange::Type],
            )
            .unwrap_or_default();
        assert_eq!(out[0].to_inline_sql(), "ALTER TABLE `t` MODIFY COLUMN `n` BIGINT NOT NULL");
        assert_eq!(
            d.map_data_type(&DataType::InlineEnum(vec!["a".into(), "b".into()])).ok().as_deref(),
            Some("ENUM('a', 'b')")
        );
        assert!(d.map_data_type(&DataType::Enum("role".into())).is_err());
    }

    #[test]
    fn no_vector_support() {
        assert!(my().vector().cast_vector(&[1.0]).is_err());
        assert!(my().geo().point(1.0, 2.0).is_ok());
    }
}
