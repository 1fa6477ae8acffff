//! Migration DDL rendering.
//!
//! [`MigrationDdl`] turns each [`DiffOperation`] into one or more
//! statements. Defaults produce ANSI-style DDL; dialects override the
//! statements their database spells differently. DDL never carries bind
//! parameters: defaults are inlined as literals.

use crate::error::Result;
use crate::fragment::Fragment;
use crate::schema::{
    AlterColumnChange, ColumnSnapshot, DataType, DefaultValue, DiffOperation, ForeignKeySnapshot,
    IndexSnapshot, PrimaryKey, SchemaSnapshot, TableSnapshot, UniqueConstraint,
};

use super::Dialect;

/// Name used for a constraint that has none of its own.
#[must_use]
pub fn constraint_name(table: &str, columns: &[String], suffix: &str) -> String {
    if columns.is_empty() {
        format!("{table}_{suffix}")
    } else {
        format!("{table}_{}_{suffix}", columns.join("_"))
    }
}

/// Session statements wrapped around a migration.
///
/// `before` runs ahead of the transaction and `after` runs once it has
/// ended, whether it committed or not. `check` runs inside the
/// transaction after the last statement; any row it returns aborts the
/// migration.
#[derive(Debug, Clone, Default)]
pub struct SessionGuard {
    pub before: Vec<Fragment>,
    pub check: Option<Fragment>,
    pub after: Vec<Fragment>,
}

impl SessionGuard {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.check.is_none() && self.after.is_empty()
    }
}

fn stmt(sql: String) -> Fragment {
    Fragment::raw(sql)
}

/// Dialect-specific DDL generation for migrations.
pub trait MigrationDdl: Dialect {
    /// Native type name for a column type.
    ///
    /// # Errors
    ///
    /// Fails for types the dialect cannot store.
    fn map_data_type(&self, data_type: &DataType) -> Result<String>;

    /// Type as written in a column definition. Dialects with serial
    /// pseudo-types override this.
    ///
    /// # Errors
    ///
    /// Fails for types the dialect cannot store.
    fn column_type(&self, column: &ColumnSnapshot) -> Result<String> {
        self.map_data_type(&column.data_type)
    }

    /// Clause placed after the type for generated columns.
    fn generated_clause(&self, column: &ColumnSnapshot) -> Option<String> {
        let _ = column;
        None
    }

    fn render_default(&self, default: &DefaultValue) -> String {
        default.to_sql()
    }

    fn quote_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.escape_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `"name" TYPE [generated] [NOT NULL] [DEFAULT ...]`.
    ///
    /// # Errors
    ///
    /// Fails for types the dialect cannot store.
    fn column_definition(&self, table: &TableSnapshot, column: &ColumnSnapshot) -> Result<String> {
        let _ = table;
        let mut sql = format!(
            "{} {}",
            self.escape_identifier(&column.name),
            self.column_type(column)?
        );
        if let Some(clause) = self.generated_clause(column) {
            sql.push(' ');
            sql.push_str(&clause);
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

    /// Whether the primary key is already declared on a column.
    fn primary_key_inline(&self, table: &TableSnapshot) -> bool {
        let _ = table;
        false
    }

    fn primary_key_clause(&self, table: &str, pk: &PrimaryKey) -> String {
        let name = pk
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &[], "pkey"));
        format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.escape_identifier(&name),
            self.quote_list(&pk.columns)
        )
    }

    fn unique_clause(&self, table: &str, unique: &UniqueConstraint) -> String {
        let name = unique
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &unique.columns, "key"));
        format!(
            "CONSTRAINT {} UNIQUE ({})",
            self.escape_identifier(&name),
            self.quote_list(&unique.columns)
        )
    }

    fn foreign_key_clause(&self, table: &str, fk: &ForeignKeySnapshot) -> String {
        let name = fk
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &fk.columns, "fkey"));
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.escape_identifier(&name),
            self.quote_list(&fk.columns),
            self.escape_identifier(&fk.references_table),
            self.quote_list(&fk.references_columns)
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    /// `CREATE TABLE` followed by its indexes.
    ///
    /// # Errors
    ///
    /// Fails for column types the dialect cannot store.
    fn create_table(&self, table: &TableSnapshot) -> Result<Vec<Fragment>> {
        let mut lines = Vec::new();
        for column in &table.columns {
            lines.push(format!("    {}", self.column_definition(table, column)?));
        }
        if let Some(pk) = &table.primary_key {
            if !self.primary_key_inline(table) {
                lines.push(format!("    {}", self.primary_key_clause(&table.name, pk)));
            }
        }
        for unique in &table.unique_constraints {
            lines.push(format!("    {}", self.unique_clause(&table.name, unique)));
        }
        for fk in &table.foreign_keys {
            lines.push(format!("    {}", self.foreign_key_clause(&table.name, fk)));
        }
        let mut out = vec![stmt(format!(
            "CREATE TABLE {} (\n{}\n)",
            self.escape_identifier(&table.name),
            lines.join(",\n")
        ))];
        for index in &table.indexes {
            out.push(self.create_index(&table.name, index));
        }
        Ok(out)
    }

    fn drop_table(&self, name: &str) -> Fragment {
        stmt(format!("DROP TABLE {}", self.escape_identifier(name)))
    }

    fn rename_table(&self, from: &str, to: &str) -> Fragment {
        stmt(format!(
            "ALTER TABLE {} RENAME TO {}",
            self.escape_identifier(from),
            self.escape_identifier(to)
        ))
    }

    /// # Errors
    ///
    /// Fails for column types the dialect cannot store.
    fn add_column(&self, table: &TableSnapshot, column: &ColumnSnapshot) -> Result<Fragment> {
        Ok(stmt(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.escape_identifier(&table.name),
            self.column_definition(table, column)?
        )))
    }

    fn drop_column(&self, table: &str, column: &str) -> Fragment {
        stmt(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.escape_identifier(table),
            self.escape_identifier(column)
        ))
    }

    fn rename_column(&self, table: &str, from: &str, to: &str) -> Fragment {
        stmt(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.escape_identifier(table),
            self.escape_identifier(from),
            self.escape_identifier(to)
        ))
    }

    /// Statements changing a column in place.
    ///
    /// # Errors
    ///
    /// Fails where the dialect cannot alter columns in place.
    fn alter_column(
        &self,
        table: &TableSnapshot,
        column: &ColumnSnapshot,
        changes: &[AlterColumnChange],
    ) -> Result<Vec<Fragment>> {
        let _ = (table, changes);
        Err(self.unsupported(
            "ALTER COLUMN",
            "alter_column",
            &format!("recreate the table to change `{}`", column.name),
        ))
    }

    fn create_index(&self, table: &str, index: &IndexSnapshot) -> Fragment {
        stmt(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.escape_identifier(&index.name),
            self.escape_identifier(table),
            self.quote_list(&index.columns)
        ))
    }

    fn drop_index(&self, table: &str, name: &str) -> Fragment {
        let _ = table;
        stmt(format!("DROP INDEX {}", self.escape_identifier(name)))
    }

    fn add_foreign_key(&self, table: &str, fk: &ForeignKeySnapshot) -> Fragment {
        stmt(format!(
            "ALTER TABLE {} ADD {}",
            self.escape_identifier(table),
            self.foreign_key_clause(table, fk)
        ))
    }

    fn drop_foreign_key(&self, table: &str, fk: &ForeignKeySnapshot) -> Fragment {
        let name = fk
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &fk.columns, "fkey"));
        stmt(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.escape_identifier(table),
            self.escape_identifier(&name)
        ))
    }

    fn add_unique(&self, table: &str, unique: &UniqueConstraint) -> Fragment {
        stmt(format!(
            "ALTER TABLE {} ADD {}",
            self.escape_identifier(table),
            self.unique_clause(table, unique)
        ))
    }

    fn drop_unique(&self, table: &str, unique: &UniqueConstraint) -> Fragment {
        let name = unique
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &unique.columns, "key"));
        stmt(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.escape_identifier(table),
            self.escape_identifier(&name)
        ))
    }

    fn add_primary_key(&self, table: &str, pk: &PrimaryKey) -> Fragment {
        stmt(format!(
            "ALTER TABLE {} ADD {}",
            self.escape_identifier(table),
            self.primary_key_clause(table, pk)
        ))
    }

    fn drop_primary_key(&self, table: &str, pk: &PrimaryKey) -> Fragment {
        let name = pk
            .name
            .clone()
            .unwrap_or_else(|| constraint_name(table, &[], "pkey"));
        stmt(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.escape_identifier(table),
            self.escape_identifier(&name)
        ))
    }

    /// Enum types. Dialects without named enums store them inline and
    /// render nothing.
    fn create_enum(&self, name: &str, values: &[String]) -> Vec<Fragment> {
        let _ = (name, values);
        Vec::new()
    }

    fn drop_enum(&self, name: &str) -> Vec<Fragment> {
        let _ = name;
        Vec::new()
    }

    /// # Errors
    ///
    /// Fails when the new type cannot be rendered.
    fn alter_enum(
        &self,
        name: &str,
        added: &[String],
        removed: &[String],
        values: &[String],
        desired: &SchemaSnapshot,
    ) -> Result<Vec<Fragment>> {
        let _ = (name, added, removed, values, desired);
        Ok(Vec::new())
    }

    /// Renders one operation. `desired` supplies table definitions for
    /// operations that need more than their own fields.
    ///
    /// # Errors
    ///
    /// Fails for changes the dialect cannot express.
    fn render_operation(
        &self,
        op: &DiffOperation,
        desired: &SchemaSnapshot,
    ) -> Result<Vec<Fragment>> {
        match op {
            DiffOperation::CreateTable { table } => self.create_table(table),
            DiffOperation::DropTable { name } => Ok(vec![self.drop_table(name)]),
            DiffOperation::RenameTable { from, to } => Ok(vec![self.rename_table(from, to)]),
            DiffOperation::AddColumn { table, column } => {
                let owner = desired
                    .table(table)
                    .cloned()
                    .unwrap_or_else(|| TableSnapshot::new(table.as_str()));
                Ok(vec![self.add_column(&owner, column)?])
            }
            DiffOperation::DropColumn { table, column } => {
                Ok(vec![self.drop_column(table, column)])
            }
            DiffOperation::RenameColumn { table, from, to } => {
                Ok(vec![self.rename_column(table, from, to)])
            }
            DiffOperation::AlterColumn {
                table,
                column,
                changes,
            } => {
                let owner = desired
                    .table(table)
                    .cloned()
                    .unwrap_or_else(|| TableSnapshot::new(table.as_str()));
                self.alter_column(&owner, column, changes)
            }
            DiffOperation::CreateIndex { table, index } => {
                Ok(vec![self.create_index(table, index)])
            }
            DiffOperation::DropIndex { table, name } => Ok(vec![self.drop_index(table, name)]),
            DiffOperation::AddForeignKey { table, foreign_key } => {
                Ok(vec![self.add_foreign_key(table, foreign_key)])
            }
            DiffOperation::DropForeignKey { table, foreign_key } => {
                Ok(vec![self.drop_foreign_key(table, foreign_key)])
            }
            DiffOperation::AddUniqueConstraint { table, constraint } => {
                Ok(vec![self.add_unique(table, constraint)])
            }
            DiffOperation::DropUniqueConstraint { table, constraint } => {
                Ok(vec![self.drop_unique(table, constraint)])
            }
            DiffOperation::AddPrimaryKey { table, primary_key } => {
                Ok(vec![self.add_primary_key(table, primary_key)])
            }
            DiffOperation::DropPrimaryKey { table, primary_key } => {
                Ok(vec![self.drop_primary_key(table, primary_key)])
            }
            DiffOperation::CreateEnum { name, values } => Ok(self.create_enum(name, values)),
            DiffOperation::DropEnum { name } => Ok(self.drop_enum(name)),
            DiffOperation::AlterEnum {
                name,
                added,
                removed,
                values,
            } => self.alter_enum(name, added, removed, values, desired),
        }
    }

    /// Renders an ordered operation list.
    ///
    /// # Errors
    ///
    /// Fails on the first operation the dialect cannot express.
    fn render_operations(
        &self,
        ops: &[DiffOperation],
        desired: &SchemaSnapshot,
    ) -> Result<Vec<Fragment>> {
        let mut out = Vec::new();
        for op in ops {
            out.extend(self.render_operation(op, desired)?);
        }
        Ok(out)
    }

    /// Session statements around a migration. `reset` is set when the
    /// migration is a [`drop_all`](Self::drop_all).
    fn session_guard(&self, reset: bool) -> SessionGuard {
        let _ = reset;
        SessionGuard::default()
    }

    /// Statements removing every table and enum of `current`.
    fn drop_all(&self, current: &SchemaSnapshot) -> Vec<Fragment> {
        let mut out: Vec<Fragment> = current
            .tables
            .keys()
            .map(|name| stmt(format!("DROP TABLE IF EXISTS {}", self.escape_identifier(name))))
            .collect();
        for name in current.enums.keys() {
            out.extend(self.drop_enum(name));
        }
        out
    }
}
