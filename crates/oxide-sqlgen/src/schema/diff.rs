//! Schema diff engine.
//!
//! Compares a desired [`SchemaSnapshot`] with the current one and produces
//! the ordered [`DiffOperation`]s that migrate current to desired. A
//! dropped and an added entity of the same kind may really be a rename;
//! such pairs are reported as [`AmbiguousChange`]s and produce no
//! operations until they are resolved (see [`MigrationPlan`]).
//!
//! [`MigrationPlan`]: super::MigrationPlan

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::operation::{AlterColumnChange, DiffOperation};
use super::snapshot::{ColumnSnapshot, SchemaSnapshot, TableSnapshot};

// ================================================================
// String similarity helpers
// ================================================================

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized name similarity in `[0.0, 1.0]`; 1.0 means identical.
#[allow(clippy::cast_precision_loss)]
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

/// Overlap of two tables' column names.
#[allow(clippy::cast_precision_loss)]
fn column_overlap(a: &TableSnapshot, b: &TableSnapshot) -> f64 {
    let a: BTreeSet<&str> = a.columns.iter().map(|c| c.name.as_str()).collect();
    let b: BTreeSet<&str> = b.columns.iter().map(|c| c.name.as_str()).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

// ================================================================
// Public types
// ================================================================

/// A dropped and an added entity that may be one renamed entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguousChange {
    Column {
        table: String,
        /// Column present only in the current schema.
        from: String,
        /// Column present only in the desired schema.
        to: String,
    },
    Table {
        from: String,
        to: String,
    },
}

impl AmbiguousChange {
    /// Question put to whoever resolves the change.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Column { table, from, to } => {
                format!("is `{table}.{to}` a rename of `{table}.{from}`?")
            }
            Self::Table { from, to } => format!("is table `{to}` a rename of `{from}`?"),
        }
    }
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// Operations in execution order.
    pub operations: Vec<DiffOperation>,
    /// Pairs that need a decision before they produce operations.
    pub ambiguities: Vec<AmbiguousChange>,
}

impl SchemaDiff {
    /// `true` when nothing changed and nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.ambiguities.is_empty()
    }

    /// Operations that can lose data.
    pub fn destructive(&self) -> impl Iterator<Item = &DiffOperation> {
        self.operations.iter().filter(|op| op.is_destructive())
    }
}

/// Diffs `current` against `desired`.
#[must_use]
pub fn diff(desired: &SchemaSnapshot, current: &SchemaSnapshot) -> SchemaDiff {
    diff_declining(desired, current, &BTreeSet::new())
}

/// Diffs like [`diff`], never pairing the `declined` changes again.
///
/// A declined pair is treated as an independent add and drop.
#[must_use]
pub fn diff_declining(
    desired: &SchemaSnapshot,
    current: &SchemaSnapshot,
    declined: &BTreeSet<AmbiguousChange>,
) -> SchemaDiff {
    let mut ops = Vec::new();
    let mut ambiguities = Vec::new();

    diff_enums(desired, current, &mut ops);

    // ---- table presence, with rename candidates -----------------
    let dropped: Vec<&TableSnapshot> = current
        .tables
        .values()
        .filter(|t| !desired.tables.contains_key(&t.name))
        .collect();
    let added: Vec<&TableSnapshot> = desired
        .tables
        .values()
        .filter(|t| !current.tables.contains_key(&t.name))
        .collect();

    let mut candidates = Vec::new();
    for old in &dropped {
        for new in &added {
            let change = AmbiguousChange::Table {
                from: old.name.clone(),
                to: new.name.clone(),
            };
            if !declined.contains(&change) {
                let score = similarity(&old.name, &new.name) + column_overlap(old, new);
                candidates.push((score, change));
            }
        }
    }
    let table_pairs = pick_pairs(candidates);
    let paired_from: BTreeSet<&str> = table_pairs.iter().filter_map(change_from).collect();
    let paired_to: BTreeSet<&str> = table_pairs.iter().filter_map(change_to).collect();
    ambiguities.extend(table_pairs.iter().cloned());

    let created: Vec<&TableSnapshot> = added
        .iter()
        .copied()
        .filter(|t| !paired_to.contains(t.name.as_str()))
        .collect();
    order_creates(&created, current, &mut ops);

    for (name, new) in &desired.tables {
        if let Some(old) = current.tables.get(name) {
            diff_table(old, new, declined, &mut ops, &mut ambiguities);
        }
    }

    let removed: Vec<&TableSnapshot> = dropped
        .iter()
        .copied()
        .filter(|t| !paired_from.contains(t.name.as_str()))
        .collect();
    order_drops(&removed, &mut ops);

    ops.sort_by_key(DiffOperation::phase);
    debug!(
        operations = ops.len(),
        ambiguities = ambiguities.len(),
        "schema diff computed"
    );
    SchemaDiff {
        operations: ops,
        ambiguities,
    }
}

fn change_from(change: &AmbiguousChange) -> Option<&str> {
    match change {
        AmbiguousChange::Table { from, .. } => Some(from),
        AmbiguousChange::Column { .. } => None,
    }
}

fn change_to(change: &AmbiguousChange) -> Option<&str> {
    match change {
        AmbiguousChange::Table { to, .. } => Some(to),
        AmbiguousChange::Column { .. } => None,
    }
}

fn pair_key(change: &AmbiguousChange) -> (&str, &str) {
    match change {
        AmbiguousChange::Column { from, to, .. } | AmbiguousChange::Table { from, to } => {
            (from, to)
        }
    }
}

/// Greedy matching, best score first; each side is used at most once.
fn pick_pairs(mut candidates: Vec<(f64, AmbiguousChange)>) -> Vec<AmbiguousChange> {
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    let mut used_from = BTreeSet::new();
    let mut used_to = BTreeSet::new();
    let mut picked = Vec::new();
    for (_, change) in candidates {
        let (from, to) = pair_key(&change);
        if used_from.contains(from) || used_to.contains(to) {
            continue;
        }
        used_from.insert(from.to_owned());
        used_to.insert(to.to_owned());
        picked.push(change);
    }
    picked
}

// ================================================================
// Enums
// ================================================================

fn diff_enums(desired: &SchemaSnapshot, current: &SchemaSnapshot, ops: &mut Vec<DiffOperation>) {
    for (name, values) in &desired.enums {
        match current.enums.get(name) {
            None => ops.push(DiffOperation::CreateEnum {
                name: name.clone(),
                values: values.clone(),
            }),
            Some(existing) => {
                let added: Vec<String> = values
                    .iter()
                    .filter(|v| !existing.contains(v))
                    .cloned()
                    .collect();
                let removed: Vec<String> = existing
                    .iter()
                    .filter(|v| !values.contains(v))
                    .cloned()
                    .collect();
                if !added.is_empty() || !removed.is_empty() {
                    ops.push(DiffOperation::AlterEnum {
                        name: name.clone(),
                        added,
                        removed,
                        values: values.clone(),
                    });
                }
            }
        }
    }
    for name in current.enums.keys() {
        if !desired.enums.contains_key(name) {
            ops.push(DiffOperation::DropEnum { name: name.clone() });
        }
    }
}

// ================================================================
// Whole tables
// ================================================================

/// Emits CREATE TABLE in dependency order. Foreign keys that cannot be
/// created inline (cycles, or targets that do not exist yet) become
/// separate `AddForeignKey` operations.
fn order_creates(
    created: &[&TableSnapshot],
    current: &SchemaSnapshot,
    ops: &mut Vec<DiffOperation>,
) {
    let pending_names: BTreeSet<&str> = created.iter().map(|t| t.name.as_str()).collect();
    let mut remaining: BTreeMap<&str, &TableSnapshot> =
        created.iter().map(|t| (t.name.as_str(), *t)).collect();
    let mut emitted: BTreeSet<&str> = BTreeSet::new();

    let ready = |t: &TableSnapshot, emitted: &BTreeSet<&str>| {
        t.referenced_tables()
            .all(|r| !pending_names.contains(r) || emitted.contains(r))
    };

    while !remaining.is_empty() {
        let next = remaining
            .values()
            .find(|t| ready(t, &emitted))
            .or_else(|| remaining.values().next())
            .copied();
        let Some(table) = next else {
            break;
        };
        remaining.remove(table.name.as_str());

        let mut inline = table.clone();
        let mut deferred = Vec::new();
        inline.foreign_keys.retain(|fk| {
            let target = fk.references_table.as_str();
            let ok = if target == table.name {
                true
            } else if pending_names.contains(target) {
                emitted.contains(target)
            } else {
                current.table(target).is_some_and(|t| {
                    fk.references_columns.iter().all(|c| t.column(c).is_some())
                })
            };
            if !ok {
                deferred.push(fk.clone());
            }
            ok
        });
        debug!(table = %table.name, deferred = deferred.len(), "create table");
        ops.push(DiffOperation::CreateTable { table: inline });
        for fk in deferred {
            ops.push(DiffOperation::AddForeignKey {
                table: table.name.clone(),
                foreign_key: fk,
            });
        }
        emitted.insert(table.name.as_str());
    }
}

/// Emits DROP TABLE so that referencing tables go before referenced ones.
/// In a cycle the blocking foreign keys are dropped first.
fn order_drops(removed: &[&TableSnapshot], ops: &mut Vec<DiffOperation>) {
    let mut remaining: BTreeMap<&str, &TableSnapshot> =
        removed.iter().map(|t| (t.name.as_str(), *t)).collect();
    while !remaining.is_empty() {
        // A table can go once no other remaining table references it.
        let free = remaining
            .keys()
            .find(|name| {
                !remaining
                    .values()
                    .any(|t| t.name != **name && t.referenced_tables().any(|r| r == **name))
            })
            .copied();
        let name = match free {
            Some(name) => name,
            None => {
                let Some(table) = remaining.values().next().copied() else {
                    break;
                };
                for other in remaining.values() {
                    for fk in &other.foreign_keys {
                        if fk.references_table == table.name && other.name != table.name {
                            ops.push(DiffOperation::DropForeignKey {
                                table: other.name.clone(),
                                foreign_key: fk.clone(),
                            });
                        }
                    }
                }
                table.name.as_str()
            }
        };
        remaining.remove(name);
        debug!(table = %name, "drop table");
        ops.push(DiffOperation::DropTable {
            name: String::from(name),
        });
    }
}

// ================================================================
// Table-level diff
// ================================================================

fn same_default(a: &ColumnSnapshot, b: &ColumnSnapshot) -> bool {
    match (&a.default, &b.default) {
        (None, None) => true,
        (Some(x), Some(y)) => x.equivalent(y),
        _ => false,
    }
}

fn column_changes(old: &ColumnSnapshot, new: &ColumnSnapshot) -> Vec<AlterColumnChange> {
    let mut changes = Vec::new();
    if old.data_type != new.data_type {
        changes.push(AlterColumnChange::Type);
    }
    if old.nullable != new.nullable {
        changes.push(AlterColumnChange::Nullable);
    }
    if !same_default(old, new) {
        changes.push(AlterColumnChange::Default);
    }
    if old.generated != new.generated {
        changes.push(AlterColumnChange::Generated);
    }
    changes
}

fn diff_table(
    old: &TableSnapshot,
    new: &TableSnapshot,
    declined: &BTreeSet<AmbiguousChange>,
    ops: &mut Vec<DiffOperation>,
    ambiguities: &mut Vec<AmbiguousChange>,
) {
    let table = &new.name;
    let dropped: Vec<&ColumnSnapshot> = old
        .columns
        .iter()
        .filter(|c| new.column(&c.name).is_none())
        .collect();
    let added: Vec<&ColumnSnapshot> = new
        .columns
        .iter()
        .filter(|c| old.column(&c.name).is_none())
        .collect();

    // ---- rename candidates ---------------------------------------
    let mut candidates = Vec::new();
    for d in &dropped {
        for a in &added {
            let change = AmbiguousChange::Column {
                table: table.clone(),
                from: d.name.clone(),
                to: a.name.clone(),
            };
            if declined.contains(&change) {
                continue;
            }
            let type_bonus = if d.data_type == a.data_type { 1.0 } else { 0.0 };
            candidates.push((similarity(&d.name, &a.name) + type_bonus, change));
        }
    }
    let pairs = pick_pairs(candidates);
    let paired: BTreeSet<&str> = pairs
        .iter()
        .flat_map(|c| {
            let (from, to) = pair_key(c);
            [from, to]
        })
        .collect();
    if !pairs.is_empty() {
        debug!(table = %table, count = pairs.len(), "possible column renames");
    }

    for column in &added {
        if !paired.contains(column.name.as_str()) {
            ops.push(DiffOperation::AddColumn {
                table: table.clone(),
                column: (*column).clone(),
            });
        }
    }
    for column in &dropped {
        if !paired.contains(column.name.as_str()) {
            ops.push(DiffOperation::DropColumn {
                table: table.clone(),
                column: column.name.clone(),
            });
        }
    }
    ambiguities.extend(pairs.iter().cloned());

    for new_col in &new.columns {
        if let Some(old_col) = old.column(&new_col.name) {
            let changes = column_changes(old_col, new_col);
            if !changes.is_empty() {
                ops.push(DiffOperation::AlterColumn {
                    table: table.clone(),
                    column: new_col.clone(),
                    changes,
                });
            }
        }
    }

    // ---- primary key ---------------------------------------------
    if old.primary_key_columns() != new.primary_key_columns() {
        if let Some(pk) = &old.primary_key {
            ops.push(DiffOperation::DropPrimaryKey {
                table: table.clone(),
                primary_key: pk.clone(),
            });
        }
        if let Some(pk) = &new.primary_key {
            ops.push(DiffOperation::AddPrimaryKey {
                table: table.clone(),
                primary_key: pk.clone(),
            });
        }
    }

    // ---- unique constraints ----------------------------------------
    for constraint in &old.unique_constraints {
        if !new.unique_constraints.iter().any(|u| u.columns == constraint.columns) {
            ops.push(DiffOperation::DropUniqueConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            });
        }
    }
    for constraint in &new.unique_constraints {
        if !old.unique_constraints.iter().any(|u| u.columns == constraint.columns) {
            ops.push(DiffOperation::AddUniqueConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            });
        }
    }

    // ---- foreign keys ------------------------------------------------
    for fk in &old.foreign_keys {
        if !new.foreign_keys.iter().any(|n| n.same_definition(fk)) {
            ops.push(DiffOperation::DropForeignKey {
                table: table.clone(),
                foreign_key: fk.clone(),
            });
        }
    }
    for fk in &new.foreign_keys {
        if !old.foreign_keys.iter().any(|o| o.same_definition(fk)) {
            ops.push(DiffOperation::AddForeignKey {
                table: table.clone(),
                foreign_key: fk.clone(),
            });
        }
    }

    // ---- indexes -------------------------------------------------------
    for index in &old.indexes {
        if !new.indexes.iter().any(|n| n.same_definition(index)) {
            ops.push(DiffOperation::DropIndex {
                table: table.clone(),
                name: index.name.clone(),
            });
        }
    }
    for index in &new.indexes {
        if !old.indexes.iter().any(|o| o.same_definition(index)) {
            ops.push(DiffOperation::CreateIndex {
                table: table.clone(),
                index: index.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::snapshot::ForeignKeySnapshot;
    use crate::schema::{DataType, DefaultValue};

    fn users() -> TableSnapshot {
        TableSnapshot::new("users")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new("email", DataType::Varchar(Some(255))).not_null())
            .column_def(ColumnSnapshot::new("name", DataType::Text))
            .primary_key(&["id"])
            .unique(&["email"])
    }

    fn posts() -> TableSnapshot {
        TableSnapshot::new("posts")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new("user_id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new("title", DataType::Text).not_null())
            .primary_key(&["id"])
            .foreign_key(ForeignKeySnapshot::new(&["user_id"], "users", &["id"]))
            .index("posts_user_id_idx", &["user_id"], false)
    }

    fn schema() -> SchemaSnapshot {
        SchemaSnapshot::new()
            .with_table(users())
            .with_table(posts())
            .with_enum("role", &["admin", "user"])
    }

    #[test]
    fn self_diff_is_empty() {
        let s = schema();
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn create_tables_in_dependency_order() {
        let d = diff(&schema(), &SchemaSnapshot::new());
        let names: Vec<String> = d
            .operations
            .iter()
            .filter_map(|op| match op {
                DiffOperation::CreateTable { table } => Some(table.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["users", "posts"]);
        assert!(matches!(d.operations[0], DiffOperation::CreateEnum { .. }));
    }

    #[test]
    fn fk_cycle_is_split() {
        let a = TableSnapshot::new("a")
            .column_def(ColumnSnapshot::new("id", DataType::Integer))
            .column_def(ColumnSnapshot::new("b_id", DataType::Integer))
            .foreign_key(ForeignKeySnapshot::new(&["b_id"], "b", &["id"]));
        let b = TableSnapshot::new("b")
            .column_def(ColumnSnapshot::new("id", DataType::Integer))
            .column_def(ColumnSnapshot::new("a_id", DataType::Integer))
            .foreign_key(ForeignKeySnapshot::new(&["a_id"], "a", &["id"]));
        let desired = SchemaSnapshot::new().with_table(a).with_table(b);
        let d = diff(&desired, &SchemaSnapshot::new());
        let add_fks = d
            .operations
            .iter()
            .filter(|op| matches!(op, DiffOperation::AddForeignKey { .. }))
            .count();
        assert_eq!(add_fks, 1);
        assert!(matches!(
            d.operations.last(),
            Some(DiffOperation::AddForeignKey { .. })
        ));
    }

    #[test]
    fn one_drop_one_add_is_one_ambiguity() {
        let mut desired = schema();
        desired.tables.insert(
            "users".into(),
            TableSnapshot::new("users")
                .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
                .column_def(ColumnSnapshot::new("email", DataType::Varchar(Some(255))).not_null())
                .column_def(ColumnSnapshot::new("full_name", DataType::Text))
                .primary_key(&["id"])
                .unique(&["email"]),
        );
        let d = diff(&desired, &schema());
        assert!(d.operations.is_empty(), "{:?}", d.operations);
        assert_eq!(
            d.ambiguities,
            vec![AmbiguousChange::Column {
                table: "users".into(),
                from: "name".into(),
                to: "full_name".into(),
            }]
        );
    }

    #[test]
    fn declined_pair_becomes_add_and_drop() {
        let current = SchemaSnapshot::new()
            .with_table(TableSnapshot::new("t").column_def(ColumnSnapshot::new("a", DataType::Text)));
        let desired = SchemaSnapshot::new()
            .with_table(TableSnapshot::new("t").column_def(ColumnSnapshot::new("b", DataType::Text)));
        let declined: BTreeSet<AmbiguousChange> = [AmbiguousChange::Column {
            table: "t".into(),
            from: "a".into(),
            to: "b".into(),
        }]
        .into_iter()
        .collect();
        let d = diff_declining(&desired, &current, &declined);
        assert!(d.ambiguities.is_empty());
        assert!(matches!(d.operations[0], DiffOperation::AddColumn { .. }));
        assert!(matches!(d.operations[1], DiffOperation::DropColumn { .. }));
        assert_eq!(d.destructive().count(), 1);
    }

    #[test]
    fn n_by_m_pairs_best_first() {
        let current = SchemaSnapshot::new().with_table(
            TableSnapshot::new("t")
                .column_def(ColumnSnapshot::new("first_name", DataType::Text))
                .column_def(ColumnSnapshot::new("age", DataType::Integer)),
        );
        let desired = SchemaSnapshot::new().with_table(
            TableSnapshot::new("t")
                .column_def(ColumnSnapshot::new("given_name", DataType::Text))
                .column_def(ColumnSnapshot::new("age_years", DataType::Integer))
                .column_def(ColumnSnapshot::new("nickname", DataType::Text)),
        );
        let d = diff(&desired, &current);
        assert_eq!(d.ambiguities.len(), 2);
        assert!(d.ambiguities.contains(&AmbiguousChange::Column {
            table: "t".into(),
            from: "age".into(),
            to: "age_years".into(),
        }));
        assert_eq!(d.operations.len(), 1);
    }

    #[test]
    fn table_rename_candidate() {
        let current = SchemaSnapshot::new().with_table(users());
        let mut renamed = users();
        renamed.name = "accounts".into();
        let desired = SchemaSnapshot::new().with_table(renamed);
        let d = diff(&desired, &current);
        assert_eq!(
            d.ambiguities,
            vec![AmbiguousChange::Table {
                from: "users".into(),
                to: "accounts".into(),
            }]
        );
        assert!(d.operations.is_empty());
    }

    #[test]
    fn alter_column_collects_changes() {
        let current = SchemaSnapshot::new().with_table(
            TableSnapshot::new("t").column_def(ColumnSnapshot::new("n", DataType::Integer)),
        );
        let desired = SchemaSnapshot::new().with_table(
            TableSnapshot::new("t").column_def(
                ColumnSnapshot::new("n", DataType::Bigint)
                    .not_null()
                    .default(DefaultValue::Integer(0)),
            ),
        );
        let d = diff(&desired, &current);
        assert_eq!(
            d.operations,
            vec![DiffOperation::AlterColumn {
                table: "t".into(),
                column: ColumnSnapshot::new("n", DataType::Bigint)
                    .not_null()
                    .default(DefaultValue::Integer(0)),
                changes: vec![
                    AlterColumnChange::Type,
                    AlterColumnChange::Nullable,
                    AlterColumnChange::Default
                ],
            }]
        );
    }

    #[test]
    fn equivalent_defaults_are_not_changes() {
        let col = |d| {
            SchemaSnapshot::new().with_table(
                TableSnapshot::new("t")
                    .column_def(ColumnSnapshot::new("at", DataType::Timestamp).default(d)),
            )
        };
        let current = col(DefaultValue::Expression("now()".into()));
        let desired = col(DefaultValue::Expression("CURRENT_TIMESTAMP".into()));
        assert!(diff(&desired, &current).is_empty());
    }

    #[test]
    fn enum_changes() {
        let current = SchemaSnapshot::new()
            .with_enum("role", &["admin", "guest"])
            .with_enum("old", &["x"]);
        let desired = SchemaSnapshot::new().with_enum("role", &["admin", "user"]);
        let d = diff(&desired, &current);
        assert_eq!(
            d.operations,
            vec![
                DiffOperation::AlterEnum {
                    name: "role".into(),
                    added: vec!["user".into()],
                    removed: vec!["guest".into()],
                    values: vec!["admin".into(), "user".into()],
                },
                DiffOperation::DropEnum { name: "old".into() },
            ]
        );
    }

    #[test]
    fn drop_order_and_constraint_changes() {
        let current = schema();
        let desired = SchemaSnapshot::new()
            .with_enum("role", &["admin", "user"])
            .with_table(users().index("users_name_idx", &["name"], false));
        let d = diff(&desired, &current);
        assert_eq!(
            d.operations,
            vec![
                DiffOperation::CreateIndex {
                    table: "users".into(),
                    index: crate::schema::IndexSnapshot {
                        name: "users_name_idx".into(),
                        columns: vec!["name".into()],
                        unique: false,
                    },
                },
                DiffOperation::DropTable {
                    name: "posts".into()
                },
            ]
        );
    }

    #[test]
    fn similarity_scores() {
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }
}
