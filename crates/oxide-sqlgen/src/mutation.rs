//! INSERT, UPDATE, DELETE and upsert descriptions.
//!
//! These are plain records rendered by [`MutationOps`](crate::dialect::MutationOps).

use crate::filter::Filter;
use crate::fragment::Fragment;
use crate::value::SqlValue;

/// `INSERT INTO table (columns) VALUES rows`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Ignored where RETURNING is unsupported.
    pub returning: Vec<String>,
}

impl Insert {
    #[must_use]
    pub fn into(table: &str) -> Self {
        Self {
            table: String::from(table),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| String::from(*c)).collect();
        self
    }

    #[must_use]
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(|c| String::from(*c)).collect();
        self
    }
}

/// `UPDATE table SET ... WHERE ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    /// Assignments, usually built with `SetClauseOps`.
    pub set: Vec<Fragment>,
    pub filter: Option<Filter>,
    pub returning: Vec<String>,
}

impl Update {
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: String::from(table),
            set: Vec::new(),
            filter: None,
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, assignment: Fragment) -> Self {
        self.set.push(assignment);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(|c| String::from(*c)).collect();
        self
    }
}

/// `DELETE FROM table WHERE ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub filter: Option<Filter>,
    pub returning: Vec<String>,
}

impl Delete {
    #[must_use]
    pub fn from(table: &str) -> Self {
        Self {
            table: String::from(table),
            filter: None,
            returning: Vec::new(),
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = columns.iter().map(|c| String::from(*c)).collect();
        self
    }
}

/// What an upsert does with a conflicting row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    /// Overwrite these columns with the incoming values.
    Update(Vec<String>),
    DoNothing,
}

/// Insert that resolves key conflicts.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub insert: Insert,
    /// Unique columns the conflict is detected on. MySQL ignores it and
    /// reacts to any unique key.
    pub conflict_target: Vec<String>,
    pub action: ConflictAction,
}

impl Upsert {
    /// Updates every inserted column outside the conflict target.
    #[must_use]
    pub fn update_on(insert: Insert, target: &[&str]) -> Self {
        let conflict_target: Vec<String> = target.iter().map(|c| String::from(*c)).collect();
        let columns = insert
            .columns
            .iter()
            .filter(|c| !conflict_target.contains(c))
            .cloned()
            .collect();
        Self {
            insert,
            conflict_target,
            action: ConflictAction::Update(columns),
        }
    }

    #[must_use]
    pub fn ignore_on(insert: Insert, target: &[&str]) -> Self {
        Self {
            insert,
            conflict_target: target.iter().map(|c| String::from(*c)).collect(),
            action: ConflictAction::DoNothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MutationOps, MySqlDialect, PostgresDialect, SetClauseOps, SqliteDialect};
    use crate::fragment::PlaceholderStyle;

    fn users_insert() -> Insert {
        Insert::into("users")
            .columns(&["email", "name"])
            .row(vec!["a@x.io".into(), "Ann".into()])
    }

    #[test]
    fn insert_with_returning() {
        let pg = PostgresDialect::new();
        let sql = pg
            .insert(&users_insert().returning(&["id"]))
            .map(|f| f.sql(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(
            sql,
            r#"INSERT INTO "users" ("email", "name") VALUES ($1, $2) RETURNING "id""#
        );
        let my = MySqlDialect::new();
        let sql = my
            .insert(&users_insert().returning(&["id"]))
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert_eq!(sql, "INSERT INTO `users` (`email`, `name`) VALUES (?, ?)");
    }

    #[test]
    fn insert_default_row() {
        let lite = SqliteDialect::new();
        let my = MySqlDialect::new();
        let insert = Insert::into("t");
        assert_eq!(
            lite.insert(&insert).map(|f| f.to_string()).unwrap_or_default(),
            r#"INSERT INTO "t" DEFAULT VALUES"#
        );
        assert_eq!(
            my.insert(&insert).map(|f| f.to_string()).unwrap_or_default(),
            "INSERT INTO `t` () VALUES ()"
        );
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let insert = Insert::into("t").columns(&["a", "b"]).row(vec![1_i64.into()]);
        assert!(PostgresDialect::new().insert(&insert).is_err());
    }

    #[test]
    fn update_and_delete() {
        let pg = PostgresDialect::new();
        let update = Update::table("posts")
            .set(pg.assign("title", "Hi".into()))
            .set(pg.increment("views", 1_i64.into()))
            .filter(Filter::eq("id", 7_i64));
        let (sql, params) = pg
            .update(&update)
            .map(|f| f.render(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(
            sql,
            r#"UPDATE "posts" SET "title" = $1, "views" = "views" + $2 WHERE "posts"."id" = $3"#
        );
        assert_eq!(params.len(), 3);

        let delete = Delete::from("posts").filter(Filter::is_null("published_at"));
        let sql = pg.delete(&delete).map(|f| f.to_string()).unwrap_or_default();
        assert_eq!(sql, r#"DELETE FROM "posts" WHERE "posts"."published_at" IS NULL"#);
    }

    #[test]
    fn upsert_per_dialect() {
        let upsert = Upsert::update_on(users_insert(), &["email"]);
        let pg = PostgresDialect::new()
            .upsert(&upsert)
            .map(|f| f.sql(PlaceholderStyle::Dollar))
            .unwrap_or_default();
        assert_eq!(
            pg,
            r#"INSERT INTO "users" ("email", "name") VALUES ($1, $2) ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name""#
        );
        let my = MySqlDialect::new()
            .upsert(&upsert)
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert_eq!(
            my,
            "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
        );
        let ignore = Upsert::ignore_on(users_insert(), &["email"]);
        let my = MySqlDialect::new()
            .upsert(&ignore)
            .map(|f| f.to_string())
            .unwrap_or_default();
        assert_eq!(
            my,
            "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `email` = `email`"
        );
    }
}
