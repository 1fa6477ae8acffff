//! SQLite adapter.
//!
//! Lists live in JSON arrays and are queried through `json_each`. SQLite
//! cannot alter columns or constraints in place, so
//! [`MigrationDdl::render_operations`] rebuilds affected tables: create
//! the new shape under a temporary name, copy the rows, swap the tables.

use std::collections::BTreeSet;

use super::ddl::SessionGuard;
use super::{
    call, json_path, AggregateOps, ArrayOps, Capabilities, ClauseOps, CteOps, Dialect,
    DialectAdapter, DialectKind, ExpressionOps, GeoOps, JoinOps, JsonOps, MigrationDdl,
    MutationOps, OrderOps, PathSegment, RelationFilterOps, SetClauseOps, SetOps, SubqueryOps,
    Unsupported, VectorOps,
};
use crate::error::{Error, Result};
use crate::fragment::Fragment;
use crate::schema::{
    ColumnSnapshot, DataType, DefaultValue, DiffOperation, IndexSnapshot, SchemaSnapshot,
    TableSnapshot,
};
use crate::value::SqlValue;

const CAPABILITIES: Capabilities = Capabilities {
    supports_returning: true,
    supports_cte_with_mutations: false,
    supports_full_outer_join: true,
    supports_distinct_on: false,
    supports_ilike: false,
    supports_native_arrays: false,
    supports_transactional_ddl: true,
    supports_enum_types: false,
    supports_nulls_ordering: true,
};

static NO_VECTOR: Unsupported = Unsupported {
    dialect: "sqlite",
    feature: "vector similarity",
    suggestion: "use PostgreSQL with pgvector",
};

static NO_GEO: Unsupported = Unsupported {
    dialect: "sqlite",
    feature: "geospatial queries",
    suggestion: "use PostgreSQL with PostGIS or MySQL 8",
};

/// Prefix of the table a rebuild copies rows into.
const REBUILD_PREFIX: &str = "__new_";

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn json_param(value: &SqlValue) -> Fragment {
        Fragment::param(value.to_json().to_string())
    }

    /// Column declared `INTEGER PRIMARY KEY AUTOINCREMENT`, if any.
    fn inline_key(table: &TableSnapshot) -> Option<&str> {
        let [key] = table.primary_key_columns() else {
            return None;
        };
        let column = table.column(key)?;
        (column.generated.is_some() && column.data_type.is_integer()).then_some(key.as_str())
    }

    /// Whether an operation can only be applied by rebuilding its table.
    fn needs_rebuild(op: &DiffOperation) -> bool {
        match op {
            DiffOperation::AlterColumn { .. }
            | DiffOperation::AddForeignKey { .. }
            | DiffOperation::DropForeignKey { .. }
            | DiffOperation::AddUniqueConstraint { .. }
            | DiffOperation::DropUniqueConstraint { .. }
            | DiffOperation::AddPrimaryKey { .. }
            | DiffOperation::DropPrimaryKey { .. } => true,
            DiffOperation::AddColumn { column, .. } => {
                let no_default = !column.nullable && column.default.is_none();
                let computed = matches!(column.default, Some(DefaultValue::Expression(_)));
                no_default || computed || column.generated.is_some()
            }
            _ => false,
        }
    }

    /// Statements recreating `table` in its desired shape.
    ///
    /// Rows are copied for every desired column except the ones added by
    /// this migration.
    fn rebuild(&self, table: &TableSnapshot, added: &BTreeSet<&str>) -> Result<Vec<Fragment>> {
        let temp = format!("{REBUILD_PREFIX}{}", table.name);
        let mut shape = table.clone();
        shape.name.clone_from(&temp);
        shape.indexes.clear();
        let copied: Vec<String> = table
            .columns
            .iter()
            .filter(|c| !added.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();

        let mut out = self.create_table(&shape)?;
        if !copied.is_empty() {
            let cols = self.quote_list(&copied);
            out.push(Fragment::raw(format!(
                "INSERT INTO {} ({cols}) SELECT {cols} FROM {}",
                self.escape_identifier(&temp),
                self.escape_identifier(&table.name)
            )));
        }
        out.push(self.drop_table(&table.name));
        out.push(self.rename_table(&temp, &table.name));
        out.extend(table.indexes.iter().map(|i| self.create_index(&table.name, i)));
        Ok(out)
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn capabilities(&self) -> &Capabilities {
        &CAPABILITIES
    }

    fn value(&self, value: SqlValue) -> Fragment {
        match value {
            SqlValue::Json(_) | SqlValue::Array(_) => Self::json_param(&value),
            other => Fragment::param(other),
        }
    }
}

impl ExpressionOps for SqliteDialect {
    fn cast_type(&self, data_type: &DataType) -> Result<String> {
        Ok(String::from(match data_type {
            DataType::Smallint | DataType::Integer | DataType::Bigint | DataType::Boolean => {
                "INTEGER"
            }
            DataType::Real | DataType::Double => "REAL",
            DataType::Decimal { .. } => "NUMERIC",
            DataType::Blob => "BLOB",
            _ => "TEXT",
        }))
    }
}

impl AggregateOps for SqliteDialect {
    fn json_agg(&self, x: Fragment) -> Fragment {
        call("json_group_array", vec![x])
    }

    fn string_agg(&self, x: Fragment, separator: &str) -> Fragment {
        call("group_concat", vec![x, Fragment::param(separator)])
    }
}

impl JsonOps for SqliteDialect {
    fn json_get(&self, column: Fragment, path: &[PathSegment]) -> Fragment {
        column
            .with_raw(" -> ")
            .then(Fragment::param(json_path(path)))
            .parens()
    }

    fn json_get_text(&self, column: Fragment, path: &[PathSegment]) -> Fragment {
        call("json_extract", vec![column, Fragment::param(json_path(path))])
    }

    fn json_contains(&self, column: Fragment, value: &serde_json::Value) -> Result<Fragment> {
        let _ = (column, value);
        Err(self.unsupported(
            "JSON containment",
            "json_contains",
            "compare individual paths with json_get_text",
        ))
    }

    fn json_has_key(&self, column: Fragment, key: &str) -> Fragment {
        call(
            "json_type",
            vec![column, Fragment::param(json_path(&[key.into()]))],
        )
        .with_raw(" IS NOT NULL")
    }

    fn json_array_length(&self, column: Fragment) -> Fragment {
        call("json_array_length", vec![column])
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
            "json_set",
            vec![
                column,
                Fragment::param(json_path(path)),
                call("json", vec![Self::json_param(&value)]),
            ],
        ))
    }
}

impl ArrayOps for SqliteDialect {
    fn array_has(&self, column: Fragment, value: SqlValue) -> Fragment {
        Fragment::raw("EXISTS (SELECT 1 FROM json_each(")
            .then(column)
            .with_raw(") WHERE json_each.value = ")
            .then(Fragment::param(value))
            .with_raw(")")
    }

    fn array_has_every(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment {
        Fragment::raw("NOT EXISTS (SELECT 1 FROM json_each(")
            .then(Self::json_param(&SqlValue::Array(values)))
            .with_raw(") AS needle WHERE needle.value NOT IN (SELECT value FROM json_each(")
            .then(column)
            .with_raw(")))")
    }

    fn array_has_some(&self, column: Fragment, values: Vec<SqlValue>) -> Fragment {
        Fragment::raw("EXISTS (SELECT 1 FROM json_each(")
            .then(column)
            .with_raw(") WHERE json_each.value IN (SELECT value FROM json_each(")
            .then(Self::json_param(&SqlValue::Array(values)))
            .with_raw(")))")
    }

    fn array_is_empty(&self, column: Fragment) -> Fragment {
        call(
            "COALESCE",
            vec![call("json_array_length", vec![column]), Fragment::raw("0")],
        )
        .with_raw(" = 0")
    }

    fn array_length(&self, column: Fragment) -> Fragment {
        call("json_array_length", vec![column])
    }

    fn array_get(&self, column: Fragment, index: usize) -> Fragment {
        call("json_extract", vec![column, Fragment::raw(format!("'$[{index}]'"))])
    }
}

impl OrderOps for SqliteDialect {}

impl ClauseOps for SqliteDialect {
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> Fragment {
        match (limit, offset) {
            (None, Some(offset)) => Fragment::raw(format!("LIMIT -1 OFFSET {offset}")),
            (Some(limit), Some(offset)) => Fragment::raw(format!("LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => Fragment::raw(format!("LIMIT {limit}")),
            (None, None) => Fragment::empty(),
        }
    }
}

impl SetClauseOps for SqliteDialect {
    fn array_push(&self, column: &str, value: SqlValue) -> Fragment {
        let current = call(
            "COALESCE",
            vec![self.identifier(column), Fragment::raw("'[]'")],
        );
        self.assign_expr(
            column,
            call(
                "json_insert",
                vec![current, Fragment::raw("'$[#]'"), Fragment::param(value)],
            ),
        )
    }

    fn array_set(&self, column: &str, index: usize, value: SqlValue) -> Fragment {
        self.assign_expr(
            column,
            call(
                "json_set",
                vec![
                    self.identifier(column),
                    Fragment::raw(format!("'$[{index}]'")),
                    Fragment::param(value),
                ],
            ),
        )
    }
}

impl RelationFilterOps for SqliteDialect {}

impl SubqueryOps for SqliteDialect {}

impl CteOps for SqliteDialect {}

impl MutationOps for SqliteDialect {
    fn last_insert_id(&self) -> Fragment {
        Fragment::raw("last_insert_rowid()")
    }
}

impl JoinOps for SqliteDialect {}

impl SetOps for SqliteDialect {
    fn parenthesize_compound_members(&self) -> bool {
        false
    }
}

impl MigrationDdl for SqliteDialect {
    /// Declared type names are kept readable so introspection maps them
    /// back to the same [`DataType`]; SQLite only derives an affinity.
    fn map_data_type(&self, data_type: &DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Smallint => String::from("SMALLINT"),
            DataType::Integer => String::from("INTEGER"),
            DataType::Bigint => String::from("BIGINT"),
            DataType::Real => String::from("REAL"),
            DataType::Double => String::from("DOUBLE"),
            DataType::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => String::from("DECIMAL"),
            },
            DataType::Char(Some(n)) => format!("CHAR({n})"),
            DataType::Char(None) => String::from("CHAR"),
            DataType::Varchar(Some(n)) => format!("VARCHAR({n})"),
            DataType::Varchar(None) => String::from("VARCHAR"),
            DataType::Text | DataType::Enum(_) | DataType::InlineEnum(_) => String::from("TEXT"),
            DataType::Blob => String::from("BLOB"),
            DataType::Date => String::from("DATE"),
            DataType::Time => String::from("TIME"),
            DataType::Timestamp => String::from("TIMESTAMP"),
            DataType::TimestampTz => String::from("TIMESTAMPTZ"),
            DataType::Boolean => String::from("BOOLEAN"),
            DataType::Json | DataType::Array(_) => String::from("JSON"),
            DataType::Uuid => String::from("UUID"),
            DataType::Vector(_) => return Err(NO_VECTOR.error("map_data_type")),
            DataType::Geometry => return Err(NO_GEO.error("map_data_type")),
            DataType::Custom(name) => name.clone(),
        })
    }

    fn render_default(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::Expression(expr) => {
                let upper = expr.trim().to_ascii_uppercase();
                if matches!(
                    upper.as_str(),
                    "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME"
                ) {
                    upper
                } else {
                    format!("({expr})")
                }
            }
            other => other.to_sql(),
        }
    }

    fn column_definition(&self, table: &TableSnapshot, column: &ColumnSnapshot) -> Result<String> {
        let mut sql = format!(
            "{} {}",
            self.escape_identifier(&column.name),
            self.column_type(column)?
        );
        if Self::inline_key(table) == Some(column.name.as_str()) {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }
        Ok(sql)
    }

    fn primary_key_inline(&self, table: &TableSnapshot) -> bool {
        Self::inline_key(table).is_some()
    }

    fn create_index(&self, table: &str, index: &IndexSnapshot) -> Fragment {
        Fragment::raw(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.escape_identifier(&index.name),
            self.escape_identifier(table),
            self.quote_list(&index.columns)
        ))
    }

    fn drop_index(&self, _table: &str, name: &str) -> Fragment {
        Fragment::raw(format!("DROP INDEX IF EXISTS {}", self.escape_identifier(name)))
    }

    /// Constraint and column changes need the whole operation list, so a
    /// single one is refused here.
    fn render_operation(
        &self,
        op: &DiffOperation,
        desired: &SchemaSnapshot,
    ) -> Result<Vec<Fragment>> {
        if Self::needs_rebuild(op) {
            return Err(self.unsupported(
                "in-place constraint and column changes",
                "render_operation",
                "render the whole operation list so the table is rebuilt",
            ));
        }
        if let DiffOperation::CreateTable { table } = op {
            // Foreign keys split off for cycles go back inline; SQLite does
            // not check the target at creation.
            let full = desired.table(&table.name).unwrap_or(table);
            return self.create_table(full);
        }
        match op {
            DiffOperation::AddColumn { table, column } => {
                let owner = desired
                    .table(table)
                    .cloned()
                    .unwrap_or_else(|| TableSnapshot::new(table.as_str()));
                Ok(vec![self.add_column(&owner, column)?])
            }
            DiffOperation::DropTable { name } => Ok(vec![self.drop_table(name)]),
            DiffOperation::RenameTable { from, to } => Ok(vec![self.rename_table(from, to)]),
            DiffOperation::DropColumn { table, column } => {
                Ok(vec![self.drop_column(table, column)])
            }
            DiffOperation::RenameColumn { table, from, to } => {
                Ok(vec![self.rename_column(table, from, to)])
            }
            DiffOperation::CreateIndex { table, index } => {
                Ok(vec![self.create_index(table, index)])
            }
            DiffOperation::DropIndex { table, name } => Ok(vec![self.drop_index(table, name)]),
            _ => Ok(Vec::new()),
        }
    }

    fn render_operations(
        &self,
        ops: &[DiffOperation],
        desired: &SchemaSnapshot,
    ) -> Result<Vec<Fragment>> {
        let created: BTreeSet<&str> = ops
            .iter()
            .filter_map(|op| match op {
                DiffOperation::CreateTable { table } => Some(table.name.as_str()),
                _ => None,
            })
            .collect();
        let rebuilt: BTreeSet<&str> = ops
            .iter()
            .filter(|op| Self::needs_rebuild(op))
            .filter_map(DiffOperation::table)
            .filter(|t| !created.contains(t) && desired.table(t).is_some())
            .collect();

        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut out = Vec::new();
        for op in ops {
            let table = op.table();
            let renames = matches!(
                op,
                DiffOperation::RenameTable { .. } | DiffOperation::RenameColumn { .. }
            );
            match table {
                Some(name) if rebuilt.contains(name) && !renames => {
                    if done.insert(name) {
                        let Some(target) = desired.table(name) else {
                            continue;
                        };
                        let added: BTreeSet<&str> = ops
                            .iter()
                            .filter_map(|o| match o {
                                DiffOperation::AddColumn { table, column } if table == name => {
                                    Some(column.name.as_str())
                                }
                                _ => None,
                            })
                            .collect();
                        tracing::debug!(table = name, "rebuilding sqlite table");
                        out.extend(self.rebuild(target, &added)?);
                    }
                }
                // Constraints of new tables are already inline, and dropped
                // tables take theirs with them.
                Some(name)
                    if Self::needs_rebuild(op)
                        && (created.contains(name) || desired.table(name).is_none()) => {}
                _ => out.extend(self.render_operation(op, desired)?),
            }
        }
        Ok(out)
    }

    /// `foreign_keys` is a no-op inside a transaction, so it is switched
    /// off before `BEGIN`. Rebuilds and drops then cannot trip a parent
    /// key, and `foreign_key_check` catches rows left dangling.
    fn session_guard(&self, reset: bool) -> SessionGuard {
        let _ = reset;
        SessionGuard {
            before: vec![Fragment::raw("PRAGMA foreign_keys = OFF")],
            check: Some(Fragment::raw("PRAGMA foreign_key_check")),
            after: vec![Fragment::raw("PRAGMA foreign_keys = ON")],
        }
    }

    /// Referencing tables are dropped before the tables they reference,
    /// so the drop also works with enforcement on.
    fn drop_all(&self, current: &SchemaSnapshot) -> Vec<Fragment> {
        drop_order(current)
            .into_iter()
            .map(|t| Fragment::raw(format!("DROP TABLE IF EXISTS {}", self.escape_identifier(t))))
            .collect()
    }
}

/// Table names with every table listed before the tables it references.
/// Cycles fall back to name order.
fn drop_order(schema: &SchemaSnapshot) -> Vec<&str> {
    let mut remaining: Vec<&TableSnapshot> = schema.tables.values().collect();
    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let free = remaining.iter().position(|t| {
            !remaining.iter().any(|other| {
                other.name != t.name && other.referenced_tables().any(|r| r == t.name)
            })
        });
        let table = remaining.remove(free.unwrap_or(0));
        order.push(table.name.as_str());
    }
    order
}

impl DialectAdapter for SqliteDialect {
    fn vector(&self) -> &dyn VectorOps {
        &NO_VECTOR
    }

    fn geo(&self) -> &dyn GeoOps {
        &NO_GEO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AlterColumnChange, ForeignKeySnapshot, Generated};

    fn lite() -> SqliteDialect {
        SqliteDialect::new()
    }

    fn sql(fragments: &[Fragment]) -> Vec<String> {
        fragments.iter().map(Fragment::to_inline_sql).collect()
    }

    fn users(age_type: DataType) -> TableSnapshot {
        TableSnapshot::new("users")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).generated(Generated::Autoincrement))
            .column_def(ColumnSnapshot::new("age", age_type))
            .primary_key(&["id"])
            .index("users_age_idx", &["age"], false)
    }

    #[test]
    fn list_operations_use_json_each() {
        let d = lite();
        let (sql, params) = d
            .array_has(d.identifier("tags"), "rust".into())
            .render(crate::fragment::PlaceholderStyle::QuestionMark);
        assert_eq!(
            sql,
            r#"EXISTS (SELECT 1 FROM json_each("tags") WHERE json_each.value = ?)"#
        );
        assert_eq!(params, vec![SqlValue::Text("rust".into())]);
        assert_eq!(
            d.array_push("tags", "x".into()).to_string(),
            r#""tags" = json_insert(COALESCE("tags", '[]'), '$[#]', ?)"#
        );
    }

    #[test]
    fn json_containment_is_unsupported() {
        let d = lite();
        assert!(d
            .json_contains(d.identifier("data"), &serde_json::json!({"a": 1}))
            .is_err());
        assert_eq!(
            d.json_has_key(d.identifier("data"), "a").to_string(),
            r#"json_type("data", ?) IS NOT NULL"#
        );
    }

    #[test]
    fn expression_defaults_are_parenthesized() {
        let d = lite();
        assert_eq!(
            d.render_default(&DefaultValue::Expression("current_timestamp".into())),
            "CURRENT_TIMESTAMP"
        );
        assert_eq!(
            d.render_default(&DefaultValue::Expression("lower('X')".into())),
            "(lower('X'))"
        );
    }

    #[test]
    fn alter_column_rebuilds_table() {
        let desired = SchemaSnapshot::new().with_table(users(DataType::Bigint));
        let ops = vec![DiffOperation::AlterColumn {
            table: "users".into(),
            column: ColumnSnapshot::new("age", DataType::Bigint),
            changes: vec![AlterColumnChange::Type],
        }];
        let out = lite().render_operations(&ops, &desired).unwrap_or_default();
        assert_eq!(
            sql(&out),
            vec![
                "CREATE TABLE \"__new_users\" (\n    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,\n    \"age\" BIGINT\n)",
                "INSERT INTO \"__new_users\" (\"id\", \"age\") SELECT \"id\", \"age\" FROM \"users\"",
                "DROP TABLE \"users\"",
                "ALTER TABLE \"__new_users\" RENAME TO \"users\"",
                "CREATE INDEX IF NOT EXISTS \"users_age_idx\" ON \"users\" (\"age\")",
            ]
        );
    }

    #[test]
    fn one_rebuild_per_table_and_added_columns_not_copied() {
        let desired = SchemaSnapshot::new().with_table(
            users(DataType::Integer)
                .column_def(ColumnSnapshot::new("email", DataType::Text).not_null()),
        );
        let ops = vec![
            DiffOperation::AddColumn {
                table: "users".into(),
                column: ColumnSnapshot::new("email", DataType::Text).not_null(),
            },
            DiffOperation::AddUniqueConstraint {
                table: "users".into(),
                constraint: crate::schema::UniqueConstraint {
                    name: None,
                    columns: vec!["email".into()],
                },
            },
        ];
        let out = sql(&lite().render_operations(&ops, &desired).unwrap_or_default());
        assert_eq!(out.iter().filter(|s| s.starts_with("CREATE TABLE")).count(), 1);
        assert!(out.contains(
            &"INSERT INTO \"__new_users\" (\"id\", \"age\") SELECT \"id\", \"age\" FROM \"users\"".to_string()
        ));
    }

    #[test]
    fn constraints_of_new_tables_stay_inline() {
        let posts = TableSnapshot::new("posts")
            .column_def(ColumnSnapshot::new("user_id", DataType::Integer))
            .foreign_key(ForeignKeySnapshot::new(&["user_id"], "users", &["id"]));
        let desired = SchemaSnapshot::new().with_table(posts.clone());
        let mut bare = posts.clone();
        bare.foreign_keys.clear();
        let ops = vec![
            DiffOperation::CreateTable { table: bare },
            DiffOperation::AddForeignKey {
                table: "posts".into(),
                foreign_key: posts.foreign_keys[0].clone(),
            },
        ];
        let out = sql(&lite().render_operations(&ops, &desired).unwrap_or_default());
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("FOREIGN KEY (\"user_id\") REFERENCES \"users\""), "{}", out[0]);
    }

    #[test]
    fn single_constraint_operation_is_refused() {
        let op = DiffOperation::DropForeignKey {
            table: "posts".into(),
            foreign_key: ForeignKeySnapshot::new(&["user_id"], "users", &["id"]),
        };
        assert!(lite().render_operation(&op, &SchemaSnapshot::new()).is_err());
    }

    #[test]
    fn drop_all_drops_referencing_tables_first() {
        let current = SchemaSnapshot::new()
            .with_table(TableSnapshot::new("authors"))
            .with_table(
                TableSnapshot::new("books").foreign_key(ForeignKeySnapshot::new(
                    &["author_id"],
                    "authors",
                    &["id"],
                )),
            );
        assert_eq!(
            sql(&lite().drop_all(&current)),
            vec![
                "DROP TABLE IF EXISTS \"books\"",
                "DROP TABLE IF EXISTS \"authors\""
            ]
        );
    }

    #[test]
    fn unsupported_types() {
        assert!(lite().map_data_type(&DataType::Vector(3)).is_err());
        assert!(lite().geo().point(0.0, 0.0).is_err());
    }
}
