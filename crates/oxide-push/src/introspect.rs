//! Reads the current schema of a live database into a [`SchemaSnapshot`].
//!
//! Each dialect is read from its own catalog: `sqlite_master` and the
//! table pragmas on SQLite, `pg_catalog` on PostgreSQL (current schema
//! only) and `information_schema` on MySQL (current database only).
//! Catalog columns are cast to plain text or integers so every value
//! decodes through the generic driver.

use std::collections::BTreeMap;

use oxide_sqlgen::schema::{
    ColumnSnapshot, DataType, DefaultValue, ForeignKeyAction, ForeignKeySnapshot, Generated,
    IndexSnapshot, PrimaryKey, SchemaSnapshot, TableSnapshot, UniqueConstraint,
};
use oxide_sqlgen::{DialectKind, Result};
use tracing::{debug, info};

use crate::driver::{Driver, Row};

/// Reads the schema the driver is connected to.
///
/// # Errors
///
/// Fails when a catalog query fails.
pub async fn introspect(driver: &mut dyn Driver) -> Result<SchemaSnapshot> {
    let kind = driver.kind();
    let schema = match kind {
        DialectKind::Sqlite => sqlite(driver).await?,
        DialectKind::Postgres => postgres(driver).await?,
        DialectKind::MySql => mysql(driver).await?,
    };
    info!(
        dialect = %kind,
        tables = schema.tables.len(),
        enums = schema.enums.len(),
        "introspected schema"
    );
    Ok(schema)
}

/// Parses a type name as reported by a catalog.
///
/// Unknown names are kept verbatim as [`DataType::Custom`]. On PostgreSQL,
/// names found in `enums` become [`DataType::Enum`].
#[must_use]
pub fn parse_type(
    kind: DialectKind,
    declared: &str,
    enums: &BTreeMap<String, Vec<String>>,
) -> DataType {
    let declared = declared.trim();
    if let Some(inner) = declared.strip_suffix("[]") {
        return DataType::Array(Box::new(parse_type(kind, inner, enums)));
    }
    let unquoted = declared.trim_matches('"');
    if enums.contains_key(unquoted) {
        return DataType::Enum(String::from(unquoted));
    }

    let lower = declared.to_ascii_lowercase();
    let (base, args) = match lower.find('(') {
        Some(open) => {
            let close = lower.rfind(')').unwrap_or(lower.len());
            (lower[..open].trim(), Some(&declared[open + 1..close.max(open + 1)]))
        }
        None => (lower.as_str(), None),
    };
    let numbers: Vec<u32> = args
        .map(|a| a.split(',').filter_map(|n| n.trim().parse().ok()).collect())
        .unwrap_or_default();
    let first = numbers.first().copied();

    match (kind, base) {
        (DialectKind::MySql, "tinyint") if first == Some(1) => DataType::Boolean,
        (DialectKind::MySql, "timestamp") => DataType::TimestampTz,
        (DialectKind::MySql, "datetime") => DataType::Timestamp,
        (DialectKind::MySql, "enum") => {
            DataType::InlineEnum(args.map(split_enum_values).unwrap_or_default())
        }
        (_, "smallint" | "int2") => DataType::Smallint,
        (_, "integer" | "int" | "int4" | "mediumint") => DataType::Integer,
        (_, "bigint" | "int8") => DataType::Bigint,
        (_, "real" | "float" | "float4") => DataType::Real,
        (_, "double" | "double precision" | "float8") => DataType::Double,
        (_, "decimal" | "numeric") => DataType::Decimal {
            precision: numbers.first().and_then(|n| u16::try_from(*n).ok()),
            scale: numbers.get(1).and_then(|n| u16::try_from(*n).ok()),
        },
        (_, "char" | "character" | "bpchar") => DataType::Char(first),
        (_, "varchar" | "character varying") => DataType::Varchar(first),
        (_, "text" | "tinytext" | "mediumtext" | "longtext") => DataType::Text,
        (_, "blob" | "bytea" | "tinyblob" | "mediumblob" | "longblob") => DataType::Blob,
        (_, "date") => DataType::Date,
        (_, "time" | "time without time zone") => DataType::Time,
        (_, "timestamp" | "timestamp without time zone" | "datetime") => DataType::Timestamp,
        (_, "timestamptz" | "timestamp with time zone") => DataType::TimestampTz,
        (_, "boolean" | "bool") => DataType::Boolean,
        (_, "json" | "jsonb") => DataType::Json,
        (_, "uuid") => DataType::Uuid,
        (_, "geometry") => DataType::Geometry,
        (_, "vector") => {
            first.map_or_else(|| DataType::Custom(String::from(declared)), DataType::Vector)
        }
        _ => DataType::Custom(String::from(declared)),
    }
}

// `'a','b,c'` -> ["a", "b,c"]
fn split_enum_values(list: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = list.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if quoted && chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            '\'' => {
                if quoted {
                    values.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            _ if quoted => current.push(c),
            _ => {}
        }
    }
    values
}

fn split_list(text: Option<&str>) -> Vec<String> {
    text.map(|t| {
        t.split(',')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// A table constraint as read from a catalog.
#[derive(Debug, Default)]
struct Constraint {
    table: String,
    name: String,
    kind: ConstraintKind,
    columns: Vec<String>,
    references_table: String,
    references_columns: Vec<String>,
    on_delete: Option<ForeignKeyAction>,
    on_update: Option<ForeignKeyAction>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    #[default]
    PrimaryKey,
    Unique,
    ForeignKey,
}

impl ConstraintKind {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "P" | "PRIMARY KEY" => Some(Self::PrimaryKey),
            "U" | "UNIQUE" => Some(Self::Unique),
            "F" | "FOREIGN KEY" => Some(Self::ForeignKey),
            _ => None,
        }
    }
}

fn apply_constraint(schema: &mut SchemaSnapshot, constraint: Constraint) {
    let Some(table) = schema.tables.get_mut(&constraint.table) else {
        return;
    };
    let name = Some(constraint.name);
    match constraint.kind {
        ConstraintKind::PrimaryKey => {
            table.primary_key = Some(PrimaryKey {
                name,
                columns: constraint.columns,
            });
        }
        ConstraintKind::Unique => table.unique_constraints.push(UniqueConstraint {
            name,
            columns: constraint.columns,
        }),
        ConstraintKind::ForeignKey => table.foreign_keys.push(ForeignKeySnapshot {
            name,
            columns: constraint.columns,
            references_table: constraint.references_table,
            references_columns: constraint.references_columns,
            on_delete: constraint.on_delete,
            on_update: constraint.on_update,
        }),
    }
}

fn action(row: &Row, column: &str) -> Option<ForeignKeyAction> {
    row.text(column).and_then(ForeignKeyAction::parse)
}

fn default_of(row: &Row) -> Option<DefaultValue> {
    row.text("default_value").map(DefaultValue::parse_sql)
}

// ---- SQLite --------------------------------------------------------------

fn pragma(name: &str, target: &str) -> String {
    format!("PRAGMA {name}(\"{}\")", target.replace('"', "\"\""))
}

async fn sqlite(driver: &mut dyn Driver) -> Result<SchemaSnapshot> {
    let no_enums = BTreeMap::new();
    let mut schema = SchemaSnapshot::new();
    let tables = driver
        .execute_raw(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        )
        .await?;

    for row in &tables {
        let Some(name) = row.text("name") else {
            continue;
        };
        let autoincrement = row
            .text("sql")
            .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));
        let mut table = TableSnapshot::new(name);

        let mut key: Vec<(i64, String)> = Vec::new();
        for col in driver.execute_raw(&pragma("table_info", name), &[]).await? {
            let Some(column_name) = col.text("name") else {
                continue;
            };
            let declared = col.text("type").unwrap_or_default();
            let mut column = ColumnSnapshot::new(
                column_name,
                parse_type(DialectKind::Sqlite, declared, &no_enums),
            );
            column.nullable = !col.flag("notnull");
            column.default = col.text("dflt_value").map(DefaultValue::parse_sql);
            let position = col.int("pk").unwrap_or_default();
            if position > 0 {
                key.push((position, String::from(column_name)));
            }
            table.columns.push(column);
        }
        key.sort();
        if !key.is_empty() {
            let columns: Vec<String> = key.into_iter().map(|(_, c)| c).collect();
            if autoincrement && columns.len() == 1 {
                if let Some(column) = table.columns.iter_mut().find(|c| c.name == columns[0]) {
                    column.generated = Some(Generated::Autoincrement);
                }
            }
            table.primary_key = Some(PrimaryKey {
                name: None,
                columns,
            });
        }

        let mut fks: BTreeMap<i64, ForeignKeySnapshot> = BTreeMap::new();
        for fk in driver
            .execute_raw(&pragma("foreign_key_list", name), &[])
            .await?
        {
            let id = fk.int("id").unwrap_or_default();
            let entry = fks.entry(id).or_insert_with(|| ForeignKeySnapshot {
                name: None,
                columns: Vec::new(),
                references_table: String::from(fk.text("table").unwrap_or_default()),
                references_columns: Vec::new(),
                on_delete: action(&fk, "on_delete"),
                on_update: action(&fk, "on_update"),
            });
            entry.columns.push(String::from(fk.text("from").unwrap_or_default()));
            entry
                .references_columns
                .push(String::from(fk.text("to").unwrap_or_default()));
        }
        table.foreign_keys = fks.into_values().collect();

        for index in driver.execute_raw(&pragma("index_list", name), &[]).await? {
            let Some(index_name) = index.text("name") else {
                continue;
            };
            let origin = index.text("origin").unwrap_or("c");
            if origin == "pk" {
                continue;
            }
            let columns: Vec<String> = driver
                .execute_raw(&pragma("index_info", index_name), &[])
                .await?
                .iter()
                .filter_map(|c| c.text("name").map(String::from))
                .collect();
            if origin == "u" {
                table.unique_constraints.push(UniqueConstraint {
                    name: None,
                    columns,
                });
            } else {
                table.indexes.push(IndexSnapshot {
                    name: String::from(index_name),
                    columns,
                    unique: index.flag("unique"),
                });
            }
        }

        debug!(table = %name, columns = table.columns.len(), "read table");
        schema.add_table(table);
    }
    Ok(schema)
}

// ---- PostgreSQL ----------------------------------------------------------

const PG_TABLES: &str = "\
SELECT c.relname::text AS name \
FROM pg_catalog.pg_class c \
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
WHERE c.relkind IN ('r', 'p') AND n.nspname = current_schema() \
ORDER BY 1";

const PG_ENUMS: &str = "\
SELECT t.typname::text AS name, e.enumlabel::text AS value \
FROM pg_catalog.pg_type t \
JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid \
JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
WHERE n.nspname = current_schema() \
ORDER BY t.typname, e.enumsortorder";

const PG_COLUMNS: &str = "\
SELECT c.relname::text AS table_name, a.attname::text AS column_name, \
       pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type, \
       a.attnotnull AS not_null, \
       pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS default_value, \
       a.attidentity::text AS identity \
FROM pg_catalog.pg_attribute a \
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum \
WHERE n.nspname = current_schema() AND c.relkind IN ('r', 'p') \
  AND a.attnum > 0 AND NOT a.attisdropped \
ORDER BY c.relname, a.attnum";

const PG_CONSTRAINTS: &str = "\
SELECT con.conname::text AS name, t.relname::text AS table_name, con.contype::text AS kind, \
       pg_catalog.array_to_string(ARRAY( \
         SELECT a.attname::text FROM unnest(con.conkey) WITH ORDINALITY k(num, ord) \
         JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.num \
         ORDER BY k.ord), ',') AS columns, \
       r.relname::text AS references_table, \
       pg_catalog.array_to_string(ARRAY( \
         SELECT a.attname::text FROM unnest(con.confkey) WITH ORDINALITY k(num, ord) \
         JOIN pg_catalog.pg_attribute a ON a.attrelid = con.confrelid AND a.attnum = k.num \
         ORDER BY k.ord), ',') AS references_columns, \
       con.confdeltype::text AS on_delete, con.confupdtype::text AS on_update \
FROM pg_catalog.pg_constraint con \
JOIN pg_catalog.pg_class t ON t.oid = con.conrelid \
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
LEFT JOIN pg_catalog.pg_class r ON r.oid = con.confrelid \
WHERE n.nspname = current_schema() AND con.contype IN ('p', 'u', 'f') \
ORDER BY t.relname, con.conname";

const PG_INDEXES: &str = "\
SELECT i.relname::text AS name, t.relname::text AS table_name, ix.indisunique AS is_unique, \
       pg_catalog.array_to_string(ARRAY( \
         SELECT a.attname::text FROM unnest(ix.indkey::int2[]) WITH ORDINALITY k(num, ord) \
         JOIN pg_catalog.pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = k.num \
         ORDER BY k.ord), ',') AS columns \
FROM pg_catalog.pg_index ix \
JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
WHERE n.nspname = current_schema() AND NOT ix.indisprimary \
  AND NOT EXISTS (SELECT 1 FROM pg_catalog.pg_constraint c WHERE c.conindid = ix.indexrelid) \
ORDER BY t.relname, i.relname";

fn pg_column(row: &Row, enums: &BTreeMap<String, Vec<String>>) -> ColumnSnapshot {
    let declared = row.text("data_type").unwrap_or_default();
    let mut column = ColumnSnapshot::new(
        row.text("column_name").unwrap_or_default(),
        parse_type(DialectKind::Postgres, declared, enums),
    );
    column.nullable = !row.flag("not_null");
    match row.text("identity").unwrap_or_default() {
        "a" => column.generated = Some(Generated::IdentityAlways),
        "d" => column.generated = Some(Generated::IdentityByDefault),
        _ => {
            let default = row.text("default_value").unwrap_or_default();
            if default.starts_with("nextval(") {
                column.generated = Some(Generated::Autoincrement);
            } else {
                column.default = default_of(row);
            }
        }
    }
    column
}

async fn postgres(driver: &mut dyn Driver) -> Result<SchemaSnapshot> {
    let mut schema = SchemaSnapshot::new();
    for row in driver.execute_raw(PG_ENUMS, &[]).await? {
        if let (Some(name), Some(value)) = (row.text("name"), row.text("value")) {
            schema
                .enums
                .entry(String::from(name))
                .or_default()
                .push(String::from(value));
        }
    }
    for row in driver.execute_raw(PG_TABLES, &[]).await? {
        if let Some(name) = row.text("name") {
            schema.add_table(TableSnapshot::new(name));
        }
    }
    for row in driver.execute_raw(PG_COLUMNS, &[]).await? {
        let column = pg_column(&row, &schema.enums);
        let table = row.text("table_name").unwrap_or_default();
        if let Some(table) = schema.tables.get_mut(table) {
            table.columns.push(column);
        }
    }
    for row in driver.execute_raw(PG_CONSTRAINTS, &[]).await? {
        let Some(kind) = row.text("kind").and_then(ConstraintKind::parse) else {
            continue;
        };
        apply_constraint(
            &mut schema,
            Constraint {
                table: String::from(row.text("table_name").unwrap_or_default()),
                name: String::from(row.text("name").unwrap_or_default()),
                kind,
                columns: split_list(row.text("columns")),
                references_table: String::from(row.text("references_table").unwrap_or_default()),
                references_columns: split_list(row.text("references_columns")),
                on_delete: action(&row, "on_delete"),
                on_update: action(&row, "on_update"),
            },
        );
    }
    for row in driver.execute_raw(PG_INDEXES, &[]).await? {
        let table = row.text("table_name").unwrap_or_default();
        if let Some(table) = schema.tables.get_mut(table) {
            table.indexes.push(IndexSnapshot {
                name: String::from(row.text("name").unwrap_or_default()),
                columns: split_list(row.text("columns")),
                unique: row.flag("is_unique"),
            });
        }
    }
    Ok(schema)
}

// ---- MySQL ---------------------------------------------------------------

const MYSQL_TABLES: &str = "\
SELECT CAST(TABLE_NAME AS CHAR) AS name FROM information_schema.TABLES \
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
ORDER BY TABLE_NAME";

const MYSQL_COLUMNS: &str = "\
SELECT CAST(TABLE_NAME AS CHAR) AS table_name, CAST(COLUMN_NAME AS CHAR) AS column_name, \
       CAST(COLUMN_TYPE AS CHAR) AS data_type, CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
       CAST(COLUMN_DEFAULT AS CHAR) AS default_value, CAST(EXTRA AS CHAR) AS extra \
FROM information_schema.COLUMNS \
WHERE TABLE_SCHEMA = DATABASE() \
ORDER BY TABLE_NAME, ORDINAL_POSITION";

const MYSQL_CONSTRAINTS: &str = "\
SELECT CAST(k.CONSTRAINT_NAME AS CHAR) AS name, CAST(k.TABLE_NAME AS CHAR) AS table_name, \
       CAST(t.CONSTRAINT_TYPE AS CHAR) AS kind, CAST(k.COLUMN_NAME AS CHAR) AS column_name, \
       CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS references_table, \
       CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS references_column, \
       CAST(r.DELETE_RULE AS CHAR) AS on_delete, CAST(r.UPDATE_RULE AS CHAR) AS on_update \
FROM information_schema.KEY_COLUMN_USAGE k \
JOIN information_schema.TABLE_CONSTRAINTS t \
  ON t.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA AND t.TABLE_NAME = k.TABLE_NAME \
 AND t.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
  ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
WHERE k.TABLE_SCHEMA = DATABASE() \
ORDER BY k.TABLE_NAME, k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

const MYSQL_INDEXES: &str = "\
SELECT CAST(TABLE_NAME AS CHAR) AS table_name, CAST(INDEX_NAME AS CHAR) AS name, \
       CAST(NON_UNIQUE AS SIGNED) AS non_unique, CAST(COLUMN_NAME AS CHAR) AS column_name \
FROM information_schema.STATISTICS \
WHERE TABLE_SCHEMA = DATABASE() \
ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX";

fn mysql_column(row: &Row) -> ColumnSnapshot {
    let declared = row.text("data_type").unwrap_or_default();
    let mut column = ColumnSnapshot::new(
        row.text("column_name").unwrap_or_default(),
        parse_type(DialectKind::MySql, declared, &BTreeMap::new()),
    );
    column.nullable = row.flag("is_nullable");
    let extra = row.text("extra").unwrap_or_default().to_ascii_lowercase();
    if extra.contains("auto_increment") {
        column.generated = Some(Generated::Autoincrement);
    } else {
        column.default = default_of(row);
    }
    column
}

async fn mysql(driver: &mut dyn Driver) -> Result<SchemaSnapshot> {
    let mut schema = SchemaSnapshot::new();
    for row in driver.execute_raw(MYSQL_TABLES, &[]).await? {
        if let Some(name) = row.text("name") {
            schema.add_table(TableSnapshot::new(name));
        }
    }
    for row in driver.execute_raw(MYSQL_COLUMNS, &[]).await? {
        let column = mysql_column(&row);
        let table = row.text("table_name").unwrap_or_default();
        if let Some(table) = schema.tables.get_mut(table) {
            table.columns.push(column);
        }
    }

    // One row per constraint column; rows arrive grouped by constraint.
    let mut constraints: Vec<Constraint> = Vec::new();
    for row in driver.execute_raw(MYSQL_CONSTRAINTS, &[]).await? {
        let Some(kind) = row.text("kind").and_then(ConstraintKind::parse) else {
            continue;
        };
        let table = row.text("table_name").unwrap_or_default();
        let name = row.text("name").unwrap_or_default();
        let same = constraints
            .last()
            .is_some_and(|c| c.table == table && c.name == name);
        if !same {
            constraints.push(Constraint {
                table: String::from(table),
                name: String::from(name),
                kind,
                references_table: String::from(row.text("references_table").unwrap_or_default()),
                on_delete: action(&row, "on_delete"),
                on_update: action(&row, "on_update"),
                ..Constraint::default()
            });
        }
        if let Some(current) = constraints.last_mut() {
            current
                .columns
                .push(String::from(row.text("column_name").unwrap_or_default()));
            if let Some(reference) = row.text("references_column") {
                current.references_columns.push(String::from(reference));
            }
        }
    }
    // Constraints are backed by indexes of the same name.
    let backing: Vec<(String, String)> = constraints
        .iter()
        .map(|c| (c.table.clone(), c.name.clone()))
        .collect();
    for constraint in constraints {
        apply_constraint(&mut schema, constraint);
    }

    let mut indexes: Vec<(String, IndexSnapshot)> = Vec::new();
    for row in driver.execute_raw(MYSQL_INDEXES, &[]).await? {
        let table = row.text("table_name").unwrap_or_default();
        let name = row.text("name").unwrap_or_default();
        if name == "PRIMARY"
            || backing
                .iter()
                .any(|(t, n)| t.as_str() == table && n.as_str() == name)
        {
            continue;
        }
        let column = String::from(row.text("column_name").unwrap_or_default());
        match indexes.last_mut() {
            Some((t, index)) if t.as_str() == table && index.name == name => {
                index.columns.push(column);
            }
            _ => indexes.push((
                String::from(table),
                IndexSnapshot {
                    name: String::from(name),
                    columns: vec![column],
                    unique: row.int("non_unique") == Some(0),
                },
            )),
        }
    }
    for (table, index) in indexes {
        if let Some(table) = schema.tables.get_mut(&table) {
            table.indexes.push(index);
        }
    }
    Ok(schema)
}
