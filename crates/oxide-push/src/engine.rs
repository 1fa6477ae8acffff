//! Push engine.
//!
//! Runs one push against a connected database:
//!
//! 1. introspect the current schema (and drop everything under
//!    `force_reset`);
//! 2. diff it against the desired snapshot, asking the [`Resolver`] about
//!    every possible rename until none is left;
//! 3. ask [`Confirm`] before anything that can lose data;
//! 4. render the operations to dialect DDL;
//! 5. execute the statements in order, stopping at the first failure.
//!
//! A dry run stops after step 4 and reports the SQL.

use std::collections::BTreeMap;
use std::sync::Arc;

use oxide_sqlgen::dialect::{Dialect, MigrationDdl, SessionGuard};
use oxide_sqlgen::error::{QueryError, QueryErrorKind};
use oxide_sqlgen::schema::{
    grouped, AmbiguousChange, Decision, MigrationPlan, ReportSection, SchemaSnapshot,
};
use oxide_sqlgen::{DialectAdapter, Fragment};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::driver::{BoxFuture, Driver, Row};
use crate::error::{PushError, Result};
use crate::introspect::introspect;

/// Answer of a [`Resolver`] for one round of ambiguous changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Decided(BTreeMap<AmbiguousChange, Decision>),
    Cancelled,
}

/// Decides whether drop/add pairs are renames.
pub trait Resolver: Send {
    /// Called with every pending change of one round. May be called again
    /// when accepted renames surface new ambiguities.
    fn resolve<'a>(&'a mut self, changes: &'a [AmbiguousChange]) -> BoxFuture<'a, Resolution>;
}

/// Confirmation prompts.
pub trait Confirm: Send {
    /// Asked with the description of every destructive operation.
    fn on_destructive<'a>(&'a mut self, descriptions: &'a [String]) -> BoxFuture<'a, bool>;

    /// Asked with every statement before executing in strict mode.
    fn on_statements<'a>(&'a mut self, statements: &'a [String]) -> BoxFuture<'a, bool>;
}

/// When the statements of a push run inside one transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    /// Only where DDL is transactional.
    #[default]
    Auto,
    Always,
    Never,
}

/// Options of one push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunOptions {
    /// Skip the destructive-change confirmation.
    pub accept_data_loss: bool,
    /// Report the SQL without executing it.
    pub dry_run: bool,
    /// Drop every table and enum before pushing.
    pub force_reset: bool,
    /// Confirm the SQL before executing, even when nothing is destructive.
    pub strict: bool,
    pub transaction: TransactionMode,
}

/// What a push did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The database already matches the desired schema.
    NoChanges,
    /// Statements that would run.
    DryRun {
        statements: Vec<String>,
        report: Vec<ReportSection>,
    },
    /// Statements that ran.
    Applied {
        statements: Vec<String>,
        report: Vec<ReportSection>,
    },
}

impl PushOutcome {
    #[must_use]
    pub fn statements(&self) -> &[String] {
        match self {
            Self::NoChanges => &[],
            Self::DryRun { statements, .. } | Self::Applied { statements, .. } => statements,
        }
    }
}

/// Pushes desired schemas through one dialect.
pub struct PushEngine {
    adapter: Arc<dyn DialectAdapter>,
    options: RunOptions,
}

impl PushEngine {
    #[must_use]
    pub fn new(adapter: Arc<dyn DialectAdapter>, options: RunOptions) -> Self {
        Self { adapter, options }
    }

    #[must_use]
    pub const fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs a push. The driver is connected first and disconnected
    /// afterwards, whatever the result.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Cancelled`] or [`PushError::Aborted`] when the
    /// user stops the run, and [`PushError::Apply`] for the first failing
    /// statement. Earlier statements stay applied unless they ran inside a
    /// transaction.
    pub async fn push(
        &self,
        driver: &mut dyn Driver,
        desired: &SchemaSnapshot,
        resolver: &mut dyn Resolver,
        confirm: &mut dyn Confirm,
    ) -> Result<PushOutcome> {
        driver.connect().await?;
        let outcome = self.run(driver, desired, resolver, confirm).await;
        if let Err(e) = driver.disconnect().await {
            warn!(error = %e, "disconnect failed");
        }
        outcome
    }

    async fn run(
        &self,
        driver: &mut dyn Driver,
        desired: &SchemaSnapshot,
        resolver: &mut dyn Resolver,
        confirm: &mut dyn Confirm,
    ) -> Result<PushOutcome> {
        let kind = self.adapter.kind();
        let mut current = introspect(driver).await?;

        let mut reset = Vec::new();
        let mut destructive = Vec::new();
        if self.options.force_reset && !is_blank(&current) {
            reset = self.adapter.drop_all(&current);
            destructive.extend(current.tables.keys().map(|t| format!("drop table `{t}`")));
            destructive.extend(current.enums.keys().map(|e| format!("drop enum `{e}`")));
            info!(tables = current.tables.len(), "force reset");
            current = SchemaSnapshot::new();
        }

        let mut plan = MigrationPlan::new(desired, &current, kind);
        while !plan.is_resolved() {
            let pending = plan.pending().to_vec();
            debug!(count = pending.len(), "asking for rename decisions");
            let decisions = match resolver.resolve(&pending).await {
                Resolution::Decided(decisions) => decisions,
                Resolution::Cancelled => return Err(PushError::Cancelled),
            };
            if let Some(missing) = pending.iter().find(|c| !decisions.contains_key(*c)) {
                return Err(PushError::UnresolvedChange(missing.describe()));
            }
            plan.resolve(&decisions)?;
        }

        let operations = plan.operations();
        if operations.is_empty() && reset.is_empty() {
            info!("schema is up to date");
            return Ok(PushOutcome::NoChanges);
        }
        let report = grouped(&operations);
        for section in &report {
            info!("{}", section.to_string().trim_end());
        }

        destructive.extend(plan.destructive());
        if !destructive.is_empty()
            && !self.options.accept_data_loss
            && !confirm.on_destructive(&destructive).await
        {
            return Err(PushError::Aborted(String::from(
                "destructive changes were not confirmed",
            )));
        }

        let guard = self.adapter.session_guard(!reset.is_empty());
        let mut fragments = reset;
        fragments.extend(plan.render(self.adapter.as_ref())?);
        let statements: Vec<String> = fragments.iter().map(Fragment::to_inline_sql).collect();

        if self.options.dry_run {
            info!(statements = statements.len(), "dry run, nothing executed");
            return Ok(PushOutcome::DryRun { statements, report });
        }
        if self.options.strict && !confirm.on_statements(&statements).await {
            return Err(PushError::Aborted(String::from("statements were not confirmed")));
        }

        self.execute(driver, &fragments, &statements, &guard).await?;
        info!(statements = statements.len(), "schema pushed");
        Ok(PushOutcome::Applied { statements, report })
    }

    fn transactional(&self) -> bool {
        match self.options.transaction {
            TransactionMode::Always => true,
            TransactionMode::Never => false,
            TransactionMode::Auto => self.adapter.capabilities().supports_transactional_ddl,
        }
    }

    /// Runs `statements` between the dialect's session guard. The guard's
    /// closing statements run on every path once the opening ones did.
    async fn execute(
        &self,
        driver: &mut dyn Driver,
        fragments: &[Fragment],
        statements: &[String],
        guard: &SessionGuard,
    ) -> Result<()> {
        for fragment in &guard.before {
            debug!(sql = %fragment, "opening session guard");
            driver.execute(fragment).await?;
        }
        let applied = self
            .apply(driver, fragments, statements, guard.check.as_ref())
            .await;
        for fragment in &guard.after {
            match driver.execute(fragment).await {
                Ok(_) => {}
                Err(e) if applied.is_err() => warn!(error = %e, sql = %fragment, "restore failed"),
                Err(e) => return Err(e.into()),
            }
        }
        applied
    }

    async fn apply(
        &self,
        driver: &mut dyn Driver,
        fragments: &[Fragment],
        statements: &[String],
        check: Option<&Fragment>,
    ) -> Result<()> {
        let transactional = self.transactional();
        if transactional {
            driver.begin().await?;
        }
        let total = fragments.len();
        for (i, (fragment, sql)) in fragments.iter().zip(statements).enumerate() {
            debug!(sql = %sql, "executing statement");
            if let Err(source) = driver.execute(fragment).await {
                if transactional {
                    rollback(driver).await;
                }
                return Err(PushError::Apply {
                    index: i + 1,
                    total,
                    sql: sql.clone(),
                    source,
                });
            }
        }
        if let Some(check) = check {
            let failure = match driver.execute(check).await {
                Ok(rows) if rows.is_empty() => None,
                Ok(rows) => Some(dangling_references(&rows)),
                Err(e) => Some(e),
            };
            if let Some(source) = failure {
                if transactional {
                    rollback(driver).await;
                }
                return Err(PushError::Apply {
                    index: total,
                    total,
                    sql: check.to_inline_sql(),
                    source,
                });
            }
        }
        if transactional {
            driver.commit().await?;
        }
        Ok(())
    }
}

async fn rollback(driver: &mut dyn Driver) {
    if let Err(e) = driver.rollback().await {
        warn!(error = %e, "rollback failed");
    }
}

/// Error for the rows of a failed foreign key check.
fn dangling_references(rows: &[Row]) -> oxide_sqlgen::Error {
    let first = rows.first();
    let table = first.and_then(|r| r.text("table")).unwrap_or("?");
    let parent = first.and_then(|r| r.text("parent")).unwrap_or("?");
    QueryError::new(
        QueryErrorKind::ForeignKeyViolation,
        format!(
            "{} row(s) left dangling, first in `{table}` referencing `{parent}`",
            rows.len()
        ),
    )
    .into()
}

fn is_blank(schema: &SchemaSnapshot) -> bool {
    schema.tables.is_empty() && schema.enums.is_empty()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use oxide_sqlgen::schema::{ColumnSnapshot, DataType, ForeignKeySnapshot, TableSnapshot};
    use oxide_sqlgen::{adapter_for, AdapterOptions, DialectKind, SqlValue};

    use super::*;
    use crate::driver::SqlxDriver;

    #[derive(Default)]
    struct Script {
        rounds: VecDeque<Resolution>,
        seen: Vec<Vec<AmbiguousChange>>,
        destructive: Option<bool>,
        statements: Option<bool>,
        asked_destructive: Vec<String>,
        asked_statements: usize,
    }

    impl Resolver for Script {
        fn resolve<'a>(
            &'a mut self,
            changes: &'a [AmbiguousChange],
        ) -> BoxFuture<'a, Resolution> {
            self.seen.push(changes.to_vec());
            let answer = self.rounds.pop_front().unwrap_or(Resolution::Cancelled);
            Box::pin(async move { answer })
        }
    }

    impl Confirm for Script {
        fn on_destructive<'a>(&'a mut self, descriptions: &'a [String]) -> BoxFuture<'a, bool> {
            self.asked_destructive.extend(descriptions.iter().cloned());
            let answer = self.destructive.unwrap_or(false);
            Box::pin(async move { answer })
        }

        fn on_statements<'a>(&'a mut self, statements: &'a [String]) -> BoxFuture<'a, bool> {
            self.asked_statements += statements.len();
            let answer = self.statements.unwrap_or(false);
            Box::pin(async move { answer })
        }
    }

    /// Wraps an in-memory SQLite database that outlives `disconnect`.
    struct Memory {
        inner: SqlxDriver,
        executed: Vec<String>,
    }

    impl Memory {
        async fn new() -> Self {
            let mut inner = SqlxDriver::new("sqlite::memory:").unwrap();
            inner.connect().await.unwrap();
            Self {
                inner,
                executed: Vec::new(),
            }
        }

        async fn tables(&mut self) -> Vec<String> {
            self.inner
                .execute_raw(
                    "SELECT name FROM sqlite_master WHERE type = 'table' \
                     AND name NOT LIKE 'sqlite_%' ORDER BY name",
                    &[],
                )
                .await
                .unwrap()
                .iter()
                .filter_map(|r| r.text("name").map(String::from))
                .collect()
        }
    }

    impl Driver for Memory {
        fn kind(&self) -> DialectKind {
            DialectKind::Sqlite
        }

        fn connect(&mut self) -> BoxFuture<'_, oxide_sqlgen::Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn disconnect(&mut self) -> BoxFuture<'_, oxide_sqlgen::Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn execute_raw<'a>(
            &'a mut self,
            sql: &'a str,
            params: &'a [SqlValue],
        ) -> BoxFuture<'a, oxide_sqlgen::Result<Vec<Row>>> {
            Box::pin(async move {
                let control = ["SELECT", "PRAGMA", "BEGIN", "COMMIT", "ROLLBACK"];
                if !control.iter().any(|c| sql.starts_with(c)) {
                    self.executed.push(String::from(sql));
                }
                self.inner.execute_raw(sql, params).await
            })
        }
    }

    fn engine(options: RunOptions) -> PushEngine {
        PushEngine::new(
            adapter_for(DialectKind::Sqlite, AdapterOptions::default()),
            options,
        )
    }

    fn users(email: &str) -> TableSnapshot {
        TableSnapshot::new("users")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new(email, DataType::Text))
            .primary_key(&["id"])
    }

    fn schema(tables: Vec<TableSnapshot>) -> SchemaSnapshot {
        tables
            .into_iter()
            .fold(SchemaSnapshot::new(), SchemaSnapshot::with_table)
    }

    async fn seeded(tables: Vec<TableSnapshot>) -> Memory {
        let mut db = Memory::new().await;
        let mut script = Script::default();
        engine(RunOptions::default())
            .push(&mut db, &schema(tables), &mut script, &mut Script::default())
            .await
            .unwrap();
        db.executed.clear();
        db
    }

    #[tokio::test]
    async fn creates_missing_tables() {
        let mut db = Memory::new().await;
        let mut script = Script::default();
        let outcome = engine(RunOptions::default())
            .push(&mut db, &schema(vec![users("email")]), &mut script, &mut Script::default())
            .await
            .unwrap();
        assert!(matches!(outcome, PushOutcome::Applied { .. }));
        assert_eq!(db.tables().await, vec!["users".to_string()]);
        assert!(script.seen.is_empty());
    }

    #[tokio::test]
    async fn second_push_has_no_changes() {
        let mut db = seeded(vec![users("email")]).await;
        let outcome = engine(RunOptions::default())
            .push(
                &mut db,
                &schema(vec![users("email")]),
                &mut Script::default(),
                &mut Script::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::NoChanges);
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn dry_run_executes_nothing() {
        let mut db = Memory::new().await;
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let outcome = engine(options)
            .push(
                &mut db,
                &schema(vec![users("email")]),
                &mut Script::default(),
                &mut Script::default(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PushOutcome::DryRun { .. }));
        assert!(outcome.statements()[0].starts_with("CREATE TABLE \"users\""));
        assert!(db.tables().await.is_empty());
    }

    #[tokio::test]
    async fn column_rename_is_applied_in_place() {
        let mut db = seeded(vec![users("email")]).await;
        db.inner
            .execute_raw("INSERT INTO users (id, email) VALUES (1, 'a@b.c')", &[])
            .await
            .unwrap();
        let change = AmbiguousChange::Column {
            table: "users".into(),
            from: "email".into(),
            to: "mail".into(),
        };
        let mut script = Script {
            rounds: VecDeque::from([Resolution::Decided(BTreeMap::from([(
                change.clone(),
                Decision::Rename,
            )]))]),
            ..Script::default()
        };
        let mut confirm = Script::default();
        engine(RunOptions::default())
            .push(&mut db, &schema(vec![users("mail")]), &mut script, &mut confirm)
            .await
            .unwrap();
        assert_eq!(script.seen, vec![vec![change]]);
        assert!(confirm.asked_destructive.is_empty());
        assert_eq!(
            db.executed,
            vec![r#"ALTER TABLE "users" RENAME COLUMN "email" TO "mail""#.to_string()]
        );
        let rows = db
            .inner
            .execute_raw("SELECT mail FROM users", &[])
            .await
            .unwrap();
        assert_eq!(rows[0].text("mail"), Some("a@b.c"));
    }

    #[tokio::test]
    async fn add_and_drop_needs_confirmation() {
        let mut db = seeded(vec![users("email")]).await;
        let change = AmbiguousChange::Column {
            table: "users".into(),
            from: "email".into(),
            to: "mail".into(),
        };
        let mut script = Script {
            rounds: VecDeque::from([Resolution::Decided(BTreeMap::from([(
                change,
                Decision::AddAndDrop,
            )]))]),
            ..Script::default()
        };
        let mut confirm = Script::default();
        let err = engine(RunOptions::default())
            .push(&mut db, &schema(vec![users("mail")]), &mut script, &mut confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::Aborted(_)));
        assert_eq!(
            confirm.asked_destructive,
            vec!["drop column `email` from `users`".to_string()]
        );
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn accept_data_loss_skips_confirmation() {
        let legacy =
            TableSnapshot::new("legacy").column_def(ColumnSnapshot::new("id", DataType::Integer));
        let mut db = seeded(vec![users("email"), legacy]).await;
        let mut confirm = Script::default();
        let options = RunOptions {
            accept_data_loss: true,
            ..RunOptions::default()
        };
        engine(options)
            .push(
                &mut db,
                &schema(vec![users("email")]),
                &mut Script::default(),
                &mut confirm,
            )
            .await
            .unwrap();
        assert!(confirm.asked_destructive.is_empty());
        assert_eq!(db.tables().await, vec!["users".to_string()]);
    }

    #[tokio::test]
    async fn cancelled_resolver_touches_nothing() {
        let mut db = seeded(vec![users("email")]).await;
        let mut script = Script::default();
        let err = engine(RunOptions::default())
            .push(&mut db, &schema(vec![users("mail")]), &mut script, &mut Script::default())
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn missing_decision_is_an_error() {
        let mut db = seeded(vec![users("email")]).await;
        let mut script = Script {
            rounds: VecDeque::from([Resolution::Decided(BTreeMap::new())]),
            ..Script::default()
        };
        let err = engine(RunOptions::default())
            .push(&mut db, &schema(vec![users("mail")]), &mut script, &mut Script::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::UnresolvedChange(_)));
    }

    #[tokio::test]
    async fn strict_mode_confirms_statements() {
        let mut db = Memory::new().await;
        let mut confirm = Script::default();
        let options = RunOptions {
            strict: true,
            ..RunOptions::default()
        };
        let err = engine(options)
            .push(
                &mut db,
                &schema(vec![users("email")]),
                &mut Script::default(),
                &mut confirm,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PushError::Aborted(_)));
        assert_eq!(confirm.asked_statements, 1);
        assert!(db.tables().await.is_empty());

        let mut confirm = Script {
            statements: Some(true),
            ..Script::default()
        };
        engine(options)
            .push(
                &mut db,
                &schema(vec![users("email")]),
                &mut Script::default(),
                &mut confirm,
            )
            .await
            .unwrap();
        assert_eq!(db.tables().await, vec!["users".to_string()]);
    }

    #[tokio::test]
    async fn force_reset_drops_everything_first() {
        let mut db = seeded(vec![users("email")]).await;
        let mut confirm = Script {
            destructive: Some(true),
            ..Script::default()
        };
        let options = RunOptions {
            force_reset: true,
            ..RunOptions::default()
        };
        engine(options)
            .push(
                &mut db,
                &schema(vec![users("email")]),
                &mut Script::default(),
                &mut confirm,
            )
            .await
            .unwrap();
        assert_eq!(confirm.asked_destructive, vec!["drop table `users`".to_string()]);
        let position = |prefix: &str| db.executed.iter().position(|s| s.starts_with(prefix));
        let dropped = position("DROP TABLE IF EXISTS \"users\"");
        let created = position("CREATE TABLE \"users\"");
        assert!(dropped.is_some());
        assert!(dropped < created);
    }

    #[tokio::test]
    async fn failure_stops_and_rolls_back() {
        let mut db = seeded(vec![users("email")]).await;
        db.inner
            .execute_raw("INSERT INTO users (id) VALUES (1)", &[])
            .await
            .unwrap();
        // Adding a NOT NULL column without default rebuilds the table and
        // the copy fails on the existing row.
        let desired = schema(vec![users("email")
            .column_def(ColumnSnapshot::new("name", DataType::Text).not_null())]);
        let err = engine(RunOptions::default())
            .push(&mut db, &desired, &mut Script::default(), &mut Script::default())
            .await
            .unwrap_err();
        match err {
            PushError::Apply { source, index, .. } => {
                assert_eq!(source.query_kind(), Some(QueryErrorKind::NotNullViolation));
                assert!(index > 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(db.tables().await, vec!["users".to_string()]);
        let rows = db
            .inner
            .execute_raw("SELECT id FROM users", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    fn posts() -> TableSnapshot {
        TableSnapshot::new("posts")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new("user_id", DataType::Integer).not_null())
            .primary_key(&["id"])
            .foreign_key(ForeignKeySnapshot::new(&["user_id"], "users", &["id"]))
    }

    async fn with_child_rows() -> Memory {
        let mut db = seeded(vec![users("email"), posts()]).await;
        for sql in [
            "INSERT INTO users (id, email) VALUES (1, 'a@b.c')",
            "INSERT INTO posts (id, user_id) VALUES (10, 1)",
        ] {
            db.inner.execute_raw(sql, &[]).await.unwrap();
        }
        db
    }

    async fn foreign_keys_enforced(db: &mut Memory) -> bool {
        let rows = db.inner.execute_raw("PRAGMA foreign_keys", &[]).await.unwrap();
        rows[0].int("foreign_keys") == Some(1)
    }

    #[tokio::test]
    async fn referenced_table_is_rebuilt_with_children_in_place() {
        let mut db = with_child_rows().await;
        let retyped = TableSnapshot::new("users")
            .column_def(ColumnSnapshot::new("id", DataType::Integer).not_null())
            .column_def(ColumnSnapshot::new("email", DataType::Varchar(Some(255))))
            .primary_key(&["id"]);
        let options = RunOptions {
            accept_data_loss: true,
            ..RunOptions::default()
        };
        engine(options)
            .push(
                &mut db,
                &schema(vec![retyped, posts()]),
                &mut Script::default(),
                &mut Script::default(),
            )
            .await
            .unwrap();

        assert!(db.executed.iter().any(|s| s == "DROP TABLE \"users\""));
        let rows = db
            .inner
            .execute_raw(
                "SELECT users.email FROM posts JOIN users ON users.id = posts.user_id",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(rows[0].text("email"), Some("a@b.c"));
        assert!(foreign_keys_enforced(&mut db).await);
    }

    #[tokio::test]
    async fn dangling_rows_roll_the_migration_back() {
        let mut db = with_child_rows().await;
        let engine = engine(RunOptions::default());
        let guard = engine.adapter.session_guard(false);
        let delete = Fragment::raw("DELETE FROM users");
        let err = engine
            .execute(&mut db, &[delete.clone()], &[delete.to_inline_sql()], &guard)
            .await
            .unwrap_err();
        match err {
            PushError::Apply { source, sql, .. } => {
                assert_eq!(source.query_kind(), Some(QueryErrorKind::ForeignKeyViolation));
                assert_eq!(sql, "PRAGMA foreign_key_check");
            }
            other => panic!("unexpected {other:?}"),
        }
        let rows = db
            .inner
            .execute_raw("SELECT id FROM users", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(foreign_keys_enforced(&mut db).await);
    }
}
