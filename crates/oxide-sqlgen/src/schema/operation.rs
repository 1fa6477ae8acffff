//! Schema change operations.
//!
//! A [`DiffOperation`] carries exactly what is needed to render its DDL.
//! Operations are produced by the diff engine and rendered by
//! [`MigrationDdl`](crate::dialect::MigrationDdl).

use serde::{Deserialize, Serialize};

use super::snapshot::{
    ColumnSnapshot, ForeignKeySnapshot, IndexSnapshot, PrimaryKey, TableSnapshot,
    UniqueConstraint,
};

/// What changed on an altered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlterColumnChange {
    Type,
    Nullable,
    Default,
    Generated,
}

/// One schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffOperation {
    CreateTable {
        table: TableSnapshot,
    },
    DropTable {
        name: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        column: ColumnSnapshot,
    },
    DropColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    /// `column` is the desired definition.
    AlterColumn {
        table: String,
        column: ColumnSnapshot,
        changes: Vec<AlterColumnChange>,
    },
    CreateIndex {
        table: String,
        index: IndexSnapshot,
    },
    DropIndex {
        table: String,
        name: String,
    },
    AddForeignKey {
        table: String,
        foreign_key: ForeignKeySnapshot,
    },
    DropForeignKey {
        table: String,
        foreign_key: ForeignKeySnapshot,
    },
    AddUniqueConstraint {
        table: String,
        constraint: UniqueConstraint,
    },
    DropUniqueConstraint {
        table: String,
        constraint: UniqueConstraint,
    },
    AddPrimaryKey {
        table: String,
        primary_key: PrimaryKey,
    },
    DropPrimaryKey {
        table: String,
        primary_key: PrimaryKey,
    },
    CreateEnum {
        name: String,
        values: Vec<String>,
    },
    DropEnum {
        name: String,
    },
    /// `values` is the full desired value list.
    AlterEnum {
        name: String,
        added: Vec<String>,
        removed: Vec<String>,
        values: Vec<String>,
    },
}

/// Execution phase. Operations are applied in ascending phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    CreateEnums,
    RenameTables,
    CreateTables,
    RenameColumns,
    DropForeignKeys,
    DropConstraints,
    AddColumns,
    DropColumns,
    AlterColumns,
    ShrinkEnums,
    AddConstraints,
    AddForeignKeys,
    DropTables,
    DropEnums,
}

fn list(columns: &[String]) -> String {
    columns.join(", ")
}

impl DiffOperation {
    /// Phase this operation belongs to.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::CreateEnum { .. } => Phase::CreateEnums,
            Self::AlterEnum { removed, .. } if removed.is_empty() => Phase::CreateEnums,
            Self::AlterEnum { .. } => Phase::ShrinkEnums,
            Self::RenameTable { .. } => Phase::RenameTables,
            Self::CreateTable { .. } => Phase::CreateTables,
            Self::RenameColumn { .. } => Phase::RenameColumns,
            Self::DropForeignKey { .. } => Phase::DropForeignKeys,
            Self::DropIndex { .. }
            | Self::DropUniqueConstraint { .. }
            | Self::DropPrimaryKey { .. } => Phase::DropConstraints,
            Self::AddColumn { .. } => Phase::AddColumns,
            Self::DropColumn { .. } => Phase::DropColumns,
            Self::AlterColumn { .. } => Phase::AlterColumns,
            Self::AddPrimaryKey { .. }
            | Self::AddUniqueConstraint { .. }
            | Self::CreateIndex { .. } => Phase::AddConstraints,
            Self::AddForeignKey { .. } => Phase::AddForeignKeys,
            Self::DropTable { .. } => Phase::DropTables,
            Self::DropEnum { .. } => Phase::DropEnums,
        }
    }

    /// Whether applying the operation can lose data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        match self {
            Self::DropTable { .. } | Self::DropColumn { .. } | Self::DropEnum { .. } => true,
            Self::AlterEnum { removed, .. } => !removed.is_empty(),
            _ => false,
        }
    }

    /// Table the operation applies to, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table } => Some(&table.name),
            Self::DropTable { name } => Some(name),
            Self::RenameTable { to, .. } => Some(to),
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. }
            | Self::AddUniqueConstraint { table, .. }
            | Self::DropUniqueConstraint { table, .. }
            | Self::AddPrimaryKey { table, .. }
            | Self::DropPrimaryKey { table, .. } => Some(table),
            Self::CreateEnum { .. } | Self::DropEnum { .. } | Self::AlterEnum { .. } => None,
        }
    }

    /// One-line human description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("create table `{}`", table.name),
            Self::DropTable { name } => format!("drop table `{name}`"),
            Self::RenameTable { from, to } => format!("rename table `{from}` to `{to}`"),
            Self::AddColumn { table, column } => format!(
                "add column `{}` ({}) to `{table}`",
                column.name, column.data_type
            ),
            Self::DropColumn { table, column } => format!("drop column `{column}` from `{table}`"),
            Self::RenameColumn { table, from, to } => {
                format!("rename column `{from}` to `{to}` in `{table}`")
            }
            Self::AlterColumn {
                table,
                column,
                changes,
            } => {
                let what: Vec<&str> = changes
                    .iter()
                    .map(|c| match c {
                        AlterColumnChange::Type => "type",
                        AlterColumnChange::Nullable => "nullability",
                        AlterColumnChange::Default => "default",
                        AlterColumnChange::Generated => "generation",
                    })
                    .collect();
                format!(
                    "alter column `{}` in `{table}` ({})",
                    column.name,
                    what.join(", ")
                )
            }
            Self::CreateIndex { table, index } => format!(
                "create {}index `{}` on `{table}` ({})",
                if index.unique { "unique " } else { "" },
                index.name,
                list(&index.columns)
            ),
            Self::DropIndex { table, name } => format!("drop index `{name}` on `{table}`"),
            Self::AddForeignKey { table, foreign_key } => format!(
                "add foreign key ({}) on `{table}` referencing `{}`",
                list(&foreign_key.columns),
                foreign_key.references_table
            ),
            Self::DropForeignKey { table, foreign_key } => format!(
                "drop foreign key ({}) on `{table}`",
                list(&foreign_key.columns)
            ),
            Self::AddUniqueConstraint { table, constraint } => {
                format!("add unique ({}) on `{table}`", list(&constraint.columns))
            }
            Self::DropUniqueConstraint { table, constraint } => {
                format!("drop unique ({}) on `{table}`", list(&constraint.columns))
            }
            Self::AddPrimaryKey { table, primary_key } => {
                format!("add primary key ({}) on `{table}`", list(&primary_key.columns))
            }
            Self::DropPrimaryKey { table, .. } => format!("drop primary key on `{table}`"),
            Self::CreateEnum { name, values } => {
                format!("create enum `{name}` ({})", list(values))
            }
            Self::DropEnum { name } => format!("drop enum `{name}`"),
            Self::AlterEnum {
                name,
                added,
                removed,
                ..
            } => {
                let mut parts = Vec::new();
                if !added.is_empty() {
                    parts.push(format!("add {}", list(added)));
                }
                if !removed.is_empty() {
                    parts.push(format!("remove {}", list(removed)));
                }
                format!("alter enum `{name}`: {}", parts.join("; "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    #[test]
    fn destructive_classification() {
        let drop = DiffOperation::DropColumn {
            table: "users".into(),
            column: "bio".into(),
        };
        let add = DiffOperation::AddColumn {
            table: "users".into(),
            column: ColumnSnapshot::new("bio", DataType::Text),
        };
        let grow = DiffOperation::AlterEnum {
            name: "role".into(),
            added: vec!["owner".into()],
            removed: vec![],
            values: vec!["user".into(), "owner".into()],
        };
        let shrink = DiffOperation::AlterEnum {
            name: "role".into(),
            added: vec![],
            removed: vec!["guest".into()],
            values: vec!["user".into()],
        };
        assert!(drop.is_destructive());
        assert!(!add.is_destructive());
        assert!(!grow.is_destructive());
        assert!(shrink.is_destructive());
        assert!(grow.phase() < shrink.phase());
    }

    #[test]
    fn phases_put_renames_before_creates_and_drops_last() {
        let rename = DiffOperation::RenameTable {
            from: "a".into(),
            to: "b".into(),
        };
        let create = DiffOperation::CreateTable {
            table: TableSnapshot::new("c"),
        };
        let drop = DiffOperation::DropTable { name: "d".into() };
        assert!(rename.phase() < create.phase());
        assert!(create.phase() < drop.phase());
    }

    #[test]
    fn describe_is_readable() {
        let op = DiffOperation::AlterColumn {
            table: "users".into(),
            column: ColumnSnapshot::new("age", DataType::Bigint),
            changes: vec![AlterColumnChange::Type, AlterColumnChange::Nullable],
        };
        assert_eq!(op.describe(), "alter column `age` in `users` (type, nullability)");
        assert_eq!(op.table(), Some("users"));
    }
}
