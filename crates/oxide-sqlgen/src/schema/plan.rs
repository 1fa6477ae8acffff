//! Migration planning with rename resolution.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dialect::{DialectAdapter, DialectKind};
use crate::error::{Error, Result};
use crate::fragment::Fragment;

use super::diff::{diff_declining, AmbiguousChange, SchemaDiff};
use super::operation::DiffOperation;
use super::snapshot::SchemaSnapshot;

/// Answer to an [`AmbiguousChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The dropped entity was renamed to the added one.
    Rename,
    /// The entities are unrelated: drop one, create the other.
    AddAndDrop,
}

/// A diff between two snapshots, refined by rename decisions.
///
/// Both snapshots are normalized for the target dialect when the plan is
/// built. Each accepted rename is applied to the current snapshot so the
/// next diff sees the entity under its new name; this is how resolving a
/// table rename can surface ambiguous columns inside that table.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    kind: DialectKind,
    desired: SchemaSnapshot,
    current: SchemaSnapshot,
    renames: Vec<DiffOperation>,
    declined: BTreeSet<AmbiguousChange>,
    diff: SchemaDiff,
}

impl MigrationPlan {
    /// Diffs `current` against `desired` for the given dialect.
    #[must_use]
    pub fn new(desired: &SchemaSnapshot, current: &SchemaSnapshot, kind: DialectKind) -> Self {
        let desired = desired.normalized_for(kind);
        let current = current.normalized_for(kind);
        let declined = BTreeSet::new();
        let diff = diff_declining(&desired, &current, &declined);
        Self {
            kind,
            desired,
            current,
            renames: Vec::new(),
            declined,
            diff,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> DialectKind {
        self.kind
    }

    /// The normalized desired schema.
    #[must_use]
    pub const fn desired(&self) -> &SchemaSnapshot {
        &self.desired
    }

    /// Changes still waiting for a decision.
    #[must_use]
    pub fn pending(&self) -> &[AmbiguousChange] {
        &self.diff.ambiguities
    }

    /// `true` once no ambiguity is left.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.diff.ambiguities.is_empty()
    }

    /// Applies one round of decisions and diffs again.
    ///
    /// New ambiguities may appear afterwards; callers loop until
    /// [`MigrationPlan::is_resolved`].
    ///
    /// # Errors
    ///
    /// Fails when a decision names a change that is not pending.
    pub fn resolve(&mut self, decisions: &BTreeMap<AmbiguousChange, Decision>) -> Result<()> {
        for (change, decision) in decisions {
            if !self.diff.ambiguities.contains(change) {
                return Err(Error::invalid_argument(format!(
                    "no pending change: {}",
                    change.describe()
                )));
            }
            debug!(change = %change.describe(), ?decision, "applying decision");
            match (decision, change) {
                (Decision::AddAndDrop, _) => {
                    self.declined.insert(change.clone());
                }
                (Decision::Rename, AmbiguousChange::Table { from, to }) => {
                    self.current.rename_table(from, to);
                    self.renames.push(DiffOperation::RenameTable {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
                (Decision::Rename, AmbiguousChange::Column { table, from, to }) => {
                    self.current.rename_column(table, from, to);
                    self.renames.push(DiffOperation::RenameColumn {
                        table: table.clone(),
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }
        self.diff = diff_declining(&self.desired, &self.current, &self.declined);
        info!(
            pending = self.diff.ambiguities.len(),
            operations = self.diff.operations.len(),
            "plan re-diffed"
        );
        Ok(())
    }

    /// Every operation in execution order, renames included.
    #[must_use]
    pub fn operations(&self) -> Vec<DiffOperation> {
        let mut ops: Vec<DiffOperation> = self
            .renames
            .iter()
            .chain(&self.diff.operations)
            .cloned()
            .collect();
        ops.sort_by_key(DiffOperation::phase);
        ops
    }

    /// `true` when there is nothing to apply and nothing to decide.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.diff.is_empty()
    }

    /// Descriptions of the operations that can lose data.
    ///
    /// Add-and-drop decisions show up through their drop half.
    #[must_use]
    pub fn destructive(&self) -> Vec<String> {
        self.diff.destructive().map(DiffOperation::describe).collect()
    }

    /// Renders the plan to DDL.
    ///
    /// # Errors
    ///
    /// Fails while ambiguities are pending, or when the dialect cannot
    /// express an operation.
    pub fn render<D: DialectAdapter + ?Sized>(&self, adapter: &D) -> Result<Vec<Fragment>> {
        if let Some(change) = self.diff.ambiguities.first() {
            return Err(Error::invalid_argument(format!(
                "unresolved change: {}",
                change.describe()
            )));
        }
        adapter.render_operations(&self.operations(), &self.desired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{PostgresDialect, SqliteDialect};
    use crate::schema::{ColumnSnapshot, DataType, TableSnapshot};

    fn accounts(name: &str, email_column: &str) -> TableSnapshot {
        TableSnapshot::new(name)
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new(email_column, DataType::Text).not_null())
            .column_def(ColumnSnapshot::new("created_at", DataType::Timestamp))
            .primary_key(&["id"])
    }

    fn decide(change: &AmbiguousChange, decision: Decision) -> BTreeMap<AmbiguousChange, Decision> {
        BTreeMap::from([(change.clone(), decision)])
    }

    #[test]
    fn table_rename_yields_single_operation() {
        let current = SchemaSnapshot::new().with_table(accounts("users", "email"));
        let desired = SchemaSnapshot::new().with_table(accounts("members", "email"));
        let mut plan = MigrationPlan::new(&desired, &current, DialectKind::Postgres);
        assert_eq!(plan.pending().len(), 1);
        let change = plan.pending()[0].clone();
        assert!(plan.resolve(&decide(&change, Decision::Rename)).is_ok());
        assert!(plan.is_resolved());
        assert_eq!(
            plan.operations(),
            vec![DiffOperation::RenameTable {
                from: "users".into(),
                to: "members".into()
            }]
        );
        assert!(plan.destructive().is_empty());
    }

    #[test]
    fn add_and_drop_requires_confirmation() {
        let current = SchemaSnapshot::new().with_table(accounts("users", "email"));
        let desired = SchemaSnapshot::new().with_table(accounts("members", "email"));
        let mut plan = MigrationPlan::new(&desired, &current, DialectKind::Postgres);
        let change = plan.pending()[0].clone();
        assert!(plan.resolve(&decide(&change, Decision::AddAndDrop)).is_ok());
        let ops = plan.operations();
        assert!(matches!(ops[0], DiffOperation::CreateTable { .. }));
        assert!(matches!(ops[1], DiffOperation::DropTable { .. }));
        assert_eq!(plan.destructive(), vec!["drop table `users`".to_string()]);
    }

    #[test]
    fn table_rename_surfaces_column_ambiguity() {
        let current = SchemaSnapshot::new().with_table(accounts("users", "email"));
        let desired = SchemaSnapshot::new().with_table(accounts("members", "mail"));
        let mut plan = MigrationPlan::new(&desired, &current, DialectKind::Postgres);
        let table = plan.pending()[0].clone();
        assert!(matches!(table, AmbiguousChange::Table { .. }));
        assert!(plan.resolve(&decide(&table, Decision::Rename)).is_ok());
        assert_eq!(
            plan.pending(),
            &[AmbiguousChange::Column {
                table: "members".into(),
                from: "email".into(),
                to: "mail".into(),
            }]
        );
        let column = plan.pending()[0].clone();
        assert!(plan.resolve(&decide(&column, Decision::Rename)).is_ok());
        let sql: Vec<String> = plan
            .render(&PostgresDialect::new())
            .unwrap_or_default()
            .iter()
            .map(Fragment::to_inline_sql)
            .collect();
        assert_eq!(
            sql,
            vec![
                r#"ALTER TABLE "users" RENAME TO "members""#,
                r#"ALTER TABLE "members" RENAME COLUMN "email" TO "mail""#,
            ]
        );
    }

    #[test]
    fn unknown_decision_is_rejected() {
        let s = SchemaSnapshot::new().with_table(accounts("users", "email"));
        let mut plan = MigrationPlan::new(&s, &s, DialectKind::Sqlite);
        let bogus = AmbiguousChange::Table {
            from: "a".into(),
            to: "b".into(),
        };
        assert!(plan.resolve(&decide(&bogus, Decision::Rename)).is_err());
        assert!(plan.is_empty());
    }

    #[test]
    fn render_refuses_pending_changes() {
        let current = SchemaSnapshot::new().with_table(accounts("users", "email"));
        let desired = SchemaSnapshot::new().with_table(accounts("members", "email"));
        let plan = MigrationPlan::new(&desired, &current, DialectKind::Sqlite);
        assert!(plan.render(&SqliteDialect::new()).is_err());
    }
}
