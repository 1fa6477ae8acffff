//! Schema snapshot types.
//!
//! A [`SchemaSnapshot`] describes a schema as data: the desired one built
//! from application definitions, or the current one read back from a live
//! database. The diff engine compares two of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;

use super::types::{DataType, DefaultValue, ForeignKeyAction};

/// How a column value is generated by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generated {
    /// `SERIAL` / `AUTO_INCREMENT` / `AUTOINCREMENT`.
    Autoincrement,
    /// `GENERATED ALWAYS AS IDENTITY`.
    IdentityAlways,
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    IdentityByDefault,
}

/// A snapshot of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<Generated>,
}

const fn default_true() -> bool {
    true
}

impl ColumnSnapshot {
    /// Creates a nullable column without default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
            generated: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Marks the column as generated. Generated columns are NOT NULL.
    #[must_use]
    pub const fn generated(mut self, kind: Generated) -> Self {
        self.generated = Some(kind);
        self.nullable = false;
        self
    }
}

/// A primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// A snapshot of a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySnapshot {
    /// Optional constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Columns in this table.
    pub columns: Vec<String>,
    /// Referenced table.
    pub references_table: String,
    /// Referenced columns.
    pub references_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ForeignKeyAction>,
}

impl ForeignKeySnapshot {
    /// Creates an unnamed foreign key without referential actions.
    #[must_use]
    pub fn new(columns: &[&str], references_table: &str, references_columns: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            references_table: String::from(references_table),
            references_columns: references_columns.iter().map(|c| String::from(*c)).collect(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    // NO ACTION is what every engine reports when no action was given.
    fn effective_on_delete(&self) -> ForeignKeyAction {
        self.on_delete.unwrap_or(ForeignKeyAction::NoAction)
    }

    fn effective_on_update(&self) -> ForeignKeyAction {
        self.on_update.unwrap_or(ForeignKeyAction::NoAction)
    }

    /// Compares by definition, ignoring the constraint name.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.references_table == other.references_table
            && self.references_columns == other.references_columns
            && self.effective_on_delete() == other.effective_on_delete()
            && self.effective_on_update() == other.effective_on_update()
    }
}

/// A snapshot of a database index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Index name.
    pub name: String,
    /// Columns covered by the index.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSnapshot {
    /// Compares by definition, ignoring the index name.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns && self.unique == other.unique
    }
}

/// A snapshot of a single table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<UniqueConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSnapshot>,
}

impl TableSnapshot {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column_def(mut self, column: ColumnSnapshot) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key, named after the table.
    #[must_use]
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(PrimaryKey {
            name: Some(format!("{}_pkey", self.name)),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
        });
        self
    }

    /// Adds a unique constraint, named after the table and columns.
    #[must_use]
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique_constraints.push(UniqueConstraint {
            name: Some(format!("{}_{}_key", self.name, columns.join("_"))),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
        });
        self
    }

    /// Adds a foreign key, naming it after the table and columns if unnamed.
    #[must_use]
    pub fn foreign_key(mut self, mut fk: ForeignKeySnapshot) -> Self {
        if fk.name.is_none() {
            fk.name = Some(format!("{}_{}_fkey", self.name, fk.columns.join("_")));
        }
        self.foreign_keys.push(fk);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, name: &str, columns: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexSnapshot {
            name: String::from(name),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            unique,
        });
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSnapshot> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns, or an empty slice.
    #[must_use]
    pub fn primary_key_columns(&self) -> &[String] {
        self.primary_key
            .as_ref()
            .map_or(&[][..], |pk| pk.columns.as_slice())
    }

    /// Tables referenced by this table's foreign keys, excluding itself.
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table.as_str())
            .filter(move |t| *t != self.name)
    }

    fn rename_column_refs(&mut self, from: &str, to: &str) {
        let rename = |cols: &mut Vec<String>| {
            for c in cols.iter_mut() {
                if c == from {
                    *c = String::from(to);
                }
            }
        };
        for column in &mut self.columns {
            if column.name == from {
                column.name = String::from(to);
            }
        }
        if let Some(pk) = &mut self.primary_key {
            rename(&mut pk.columns);
        }
        for unique in &mut self.unique_constraints {
            rename(&mut unique.columns);
        }
        for fk in &mut self.foreign_keys {
            rename(&mut fk.columns);
        }
        for index in &mut self.indexes {
            rename(&mut index.columns);
        }
    }
}

/// A snapshot of an entire database schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    /// Tables keyed by name, sorted for deterministic iteration.
    #[serde(default)]
    pub tables: BTreeMap<String, TableSnapshot>,
    /// Named enum types and their ordered values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enums: BTreeMap<String, Vec<String>>,
}

impl SchemaSnapshot {
    /// Creates an empty schema snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table snapshot.
    pub fn add_table(&mut self, table: TableSnapshot) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Builder form of [`SchemaSnapshot::add_table`].
    #[must_use]
    pub fn with_table(mut self, table: TableSnapshot) -> Self {
        self.add_table(table);
        self
    }

    /// Builder that adds a named enum.
    #[must_use]
    pub fn with_enum(mut self, name: &str, values: &[&str]) -> Self {
        self.enums.insert(
            String::from(name),
            values.iter().map(|v| String::from(*v)).collect(),
        );
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.get(name)
    }

    /// Renames a table, updating foreign keys that reference it.
    pub fn rename_table(&mut self, from: &str, to: &str) {
        let Some(mut table) = self.tables.remove(from) else {
            return;
        };
        table.name = String::from(to);
        self.tables.insert(String::from(to), table);
        for table in self.tables.values_mut() {
            for fk in &mut table.foreign_keys {
                if fk.references_table == from {
                    fk.references_table = String::from(to);
                }
            }
        }
    }

    /// Renames a column, updating constraints and inbound foreign keys.
    pub fn rename_column(&mut self, table_name: &str, from: &str, to: &str) {
        if let Some(table) = self.tables.get_mut(table_name) {
            table.rename_column_refs(from, to);
        }
        for table in self.tables.values_mut() {
            for fk in &mut table.foreign_keys {
                if fk.references_table == table_name {
                    for c in &mut fk.references_columns {
                        if c == from {
                            *c = String::from(to);
                        }
                    }
                }
            }
        }
    }

    /// Rewrites the snapshot into the form a dialect can store and report.
    ///
    /// Both sides of a diff are normalized for the target dialect so that
    /// types the dialect stores differently (enums on MySQL and SQLite,
    /// arrays without native support, SQLite's integer primary keys) do not
    /// show up as changes.
    #[must_use]
    pub fn normalized_for(&self, kind: DialectKind) -> Self {
        let mut out = self.clone();
        for table in out.tables.values_mut() {
            for column in &mut table.columns {
                column.data_type = normalize_type(&column.data_type, kind, &self.enums);
                normalize_generated(column, kind);
            }
        }
        if kind != DialectKind::Postgres {
            out.enums.clear();
        }
        out
    }
}

fn normalize_type(
    data_type: &DataType,
    kind: DialectKind,
    enums: &BTreeMap<String, Vec<String>>,
) -> DataType {
    match (kind, data_type) {
        (DialectKind::Postgres, DataType::InlineEnum(_)) => DataType::Text,
        (DialectKind::Postgres, DataType::Char(None)) => DataType::Char(Some(1)),
        (DialectKind::Postgres, DataType::Array(inner)) => {
            DataType::Array(Box::new(normalize_type(inner, kind, enums)))
        }
        (DialectKind::MySql, DataType::Enum(name)) => enums
            .get(name)
            .map_or(DataType::Text, |values| DataType::InlineEnum(values.clone())),
        (DialectKind::MySql, DataType::Array(_)) => DataType::Json,
        (DialectKind::MySql, DataType::Uuid) => DataType::Char(Some(36)),
        (DialectKind::MySql, DataType::Char(None)) => DataType::Char(Some(1)),
        (DialectKind::MySql, DataType::Varchar(None)) => DataType::Varchar(Some(255)),
        (DialectKind::Sqlite, DataType::Enum(_) | DataType::InlineEnum(_)) => DataType::Text,
        (DialectKind::Sqlite, DataType::Array(_)) => DataType::Json,
        _ => data_type.clone(),
    }
}

fn normalize_generated(column: &mut ColumnSnapshot, kind: DialectKind) {
    if column.generated.is_none() {
        return;
    }
    match kind {
        DialectKind::Postgres => {}
        DialectKind::MySql => column.generated = Some(Generated::Autoincrement),
        DialectKind::Sqlite => {
            column.generated = Some(Generated::Autoincrement);
            column.data_type = DataType::Integer;
        }
    }
    column.nullable = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSnapshot {
        TableSnapshot::new("users")
            .column_def(
                ColumnSnapshot::new("id", DataType::Bigint).generated(Generated::IdentityAlways),
            )
            .column_def(ColumnSnapshot::new("email", DataType::Varchar(None)).not_null())
            .column_def(ColumnSnapshot::new("status", DataType::Enum("status".into())))
            .primary_key(&["id"])
            .unique(&["email"])
    }

    fn posts() -> TableSnapshot {
        TableSnapshot::new("posts")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new("user_id", DataType::Bigint))
            .primary_key(&["id"])
            .foreign_key(ForeignKeySnapshot::new(&["user_id"], "users", &["id"]))
            .index("posts_user_id_idx", &["user_id"], false)
    }

    #[test]
    fn builder_names_constraints() {
        let t = users();
        assert_eq!(
            t.primary_key.as_ref().and_then(|pk| pk.name.as_deref()),
            Some("users_pkey")
        );
        assert_eq!(
            t.unique_constraints[0].name.as_deref(),
            Some("users_email_key")
        );
        assert_eq!(
            posts().foreign_keys[0].name.as_deref(),
            Some("posts_user_id_fkey")
        );
    }

    #[test]
    fn rename_column_updates_references() {
        let mut schema = SchemaSnapshot::new().with_table(users()).with_table(posts());
        schema.rename_column("users", "id", "user_pk");
        let users = schema.table("users").map(TableSnapshot::primary_key_columns);
        assert_eq!(users, Some(&["user_pk".to_string()][..]));
        let posts = schema.table("posts").map(|t| t.foreign_keys[0].references_columns.clone());
        assert_eq!(posts, Some(vec!["user_pk".to_string()]));
    }

    #[test]
    fn rename_table_updates_foreign_keys() {
        let mut schema = SchemaSnapshot::new().with_table(users()).with_table(posts());
        schema.rename_table("users", "accounts");
        assert!(schema.table("users").is_none());
        assert!(schema.table("accounts").is_some());
        let target = schema.table("posts").map(|t| t.foreign_keys[0].references_table.clone());
        assert_eq!(target.as_deref(), Some("accounts"));
    }

    #[test]
    fn normalize_for_mysql_inlines_enums() {
        let schema = SchemaSnapshot::new()
            .with_table(users())
            .with_enum("status", &["active", "pending"]);
        let normalized = schema.normalized_for(DialectKind::MySql);
        let status = normalized.table("users").and_then(|t| t.column("status"));
        assert_eq!(
            status.map(|c| c.data_type.clone()),
            Some(DataType::InlineEnum(vec!["active".into(), "pending".into()]))
        );
        let email = normalized.table("users").and_then(|t| t.column("email"));
        assert_eq!(email.map(|c| c.data_type.clone()), Some(DataType::Varchar(Some(255))));
        assert!(normalized.enums.is_empty());
    }

    #[test]
    fn normalize_for_sqlite_uses_integer_autoincrement() {
        let normalized = SchemaSnapshot::new()
            .with_table(users())
            .normalized_for(DialectKind::Sqlite);
        let id = normalized.table("users").and_then(|t| t.column("id")).cloned();
        let id = id.unwrap_or_else(|| ColumnSnapshot::new("missing", DataType::Text));
        assert_eq!(id.data_type, DataType::Integer);
        assert_eq!(id.generated, Some(Generated::Autoincrement));
    }

    #[test]
    fn snapshot_json_round_trip() {
        let schema = SchemaSnapshot::new().with_table(posts());
        let json = serde_json::to_string(&schema).unwrap_or_default();
        let back: SchemaSnapshot = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back, schema);
    }

    #[test]
    fn fk_definition_ignores_name_and_default_action() {
        let a = ForeignKeySnapshot::new(&["user_id"], "users", &["id"]);
        let mut b = a.clone().on_delete(ForeignKeyAction::NoAction);
        b.name = Some("other".into());
        assert!(a.same_definition(&b));
        let c = a.clone().on_delete(ForeignKeyAction::Cascade);
        assert!(!a.same_definition(&c));
    }
}
