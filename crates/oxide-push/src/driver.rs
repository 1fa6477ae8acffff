//! Database drivers.
//!
//! The engine never talks to sqlx directly. It goes through [`Driver`],
//! which tests replace with scripted implementations.

use std::future::Future;
use std::pin::Pin;

use oxide_sqlgen::error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind};
use oxide_sqlgen::error_map::map_native_error;
use oxide_sqlgen::{DialectKind, Error, Fragment, Result, SqlValue};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, Column, Connection, Executor as _, Row as _};
use tracing::debug;

/// Boxed future returned by the async trait methods of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One result row, with values decoded into [`SqlValue`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Builds a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, SqlValue)>,
        S: Into<String>,
    {
        let (columns, values) = pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    /// Text value of a column. Non-text values are `None`.
    #[must_use]
    pub fn text(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of a column, accepting numeric text.
    #[must_use]
    pub fn int(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            SqlValue::Int(n) => Some(*n),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value of a column. Catalogs report flags as booleans,
    /// integers or `YES`/`NO` text.
    #[must_use]
    pub fn flag(&self, column: &str) -> bool {
        match self.get(column) {
            Some(SqlValue::Bool(b)) => *b,
            Some(SqlValue::Int(n)) => *n != 0,
            Some(SqlValue::Text(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "y" | "t" | "true" | "1")
            }
            _ => false,
        }
    }
}

/// Access to one database session.
///
/// `execute` renders the fragment with the placeholder style of the
/// driver's dialect. Transactions are explicit: `begin`, then `commit` or
/// `rollback`.
pub trait Driver: Send {
    /// Dialect of the connected database.
    fn kind(&self) -> DialectKind;

    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Runs one statement and returns its rows.
    fn execute_raw<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> BoxFuture<'a, Result<Vec<Row>>>;

    fn execute<'a>(&'a mut self, fragment: &'a Fragment) -> BoxFuture<'a, Result<Vec<Row>>> {
        let (sql, params) = fragment.render(self.kind().placeholder_style());
        Box::pin(async move { self.execute_raw(&sql, &params).await })
    }

    fn begin(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.execute_raw("BEGIN", &[]).await.map(drop) })
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.execute_raw("COMMIT", &[]).await.map(drop) })
    }

    fn rollback(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.execute_raw("ROLLBACK", &[]).await.map(drop) })
    }
}

/// Maps a sqlx error onto the taxonomy.
#[must_use]
pub fn map_sqlx_error(kind: DialectKind, err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db) => map_native_error(kind, db.code().as_deref(), db.message()),
        sqlx::Error::PoolTimedOut => {
            ConnectionError::new(ConnectionErrorKind::PoolExhausted, err.to_string()).into()
        }
        sqlx::Error::Tls(e) => {
            ConnectionError::new(ConnectionErrorKind::SslRequired, e.to_string()).into()
        }
        sqlx::Error::Io(e) => {
            let kind = if e.kind() == std::io::ErrorKind::TimedOut {
                ConnectionErrorKind::Timeout
            } else {
                ConnectionErrorKind::HostUnreachable
            };
            ConnectionError::new(kind, e.to_string()).into()
        }
        sqlx::Error::Configuration(e) => {
            ConnectionError::new(ConnectionErrorKind::Other, e.to_string()).into()
        }
        sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            ConnectionError::new(ConnectionErrorKind::Other, err.to_string()).into()
        }
        other => QueryError::new(QueryErrorKind::Other, other.to_string()).into(),
    }
}

fn bind<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(n) => query.bind(*n),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Blob(b) => query.bind(b.clone()),
        SqlValue::Json(_) | SqlValue::Array(_) => query.bind(value.to_json().to_string()),
    }
}

// Tries the Any driver's value kinds in turn; a NULL decodes as `None`
// on the first attempt.
fn decode(row: &AnyRow, index: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map_or(SqlValue::Null, SqlValue::Bool);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(index) {
        return SqlValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(index) {
        return SqlValue::Float(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(index) {
        return SqlValue::Text(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return SqlValue::Blob(v);
    }
    SqlValue::Null
}

fn convert(row: &AnyRow) -> Row {
    Row::from_pairs(
        row.columns()
            .iter()
            .map(|c| (c.name().to_string(), decode(row, c.ordinal()))),
    )
}

/// [`Driver`] over a single sqlx connection.
///
/// The dialect is taken from the URL scheme unless given explicitly.
/// Statements without parameters go over the simple query protocol, which
/// accepts every DDL statement; the rest are prepared.
pub struct SqlxDriver {
    url: String,
    kind: DialectKind,
    conn: Option<AnyConnection>,
}

impl SqlxDriver {
    /// Creates a driver for `url`.
    ///
    /// # Errors
    ///
    /// Fails when the URL scheme names no supported dialect.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let kind = DialectKind::from_url(&url).ok_or_else(|| {
            Error::invalid_argument(format!("cannot tell the dialect of `{url}`"))
        })?;
        Ok(Self::with_kind(url, kind))
    }

    #[must_use]
    pub fn with_kind(url: impl Into<String>, kind: DialectKind) -> Self {
        Self {
            url: url.into(),
            kind,
            conn: None,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connection(&mut self) -> Result<&mut AnyConnection> {
        self.conn.as_mut().ok_or_else(|| {
            ConnectionError::new(ConnectionErrorKind::Other, "driver is not connected").into()
        })
    }
}

impl Driver for SqlxDriver {
    fn kind(&self) -> DialectKind {
        self.kind
    }

    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.conn.is_some() {
                return Ok(());
            }
            sqlx::any::install_default_drivers();
            let conn = AnyConnection::connect(&self.url)
                .await
                .map_err(|e| map_sqlx_error(self.kind, e))?;
            debug!(dialect = %self.kind, "connected");
            self.conn = Some(conn);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(conn) = self.conn.take() {
                conn.close().await.map_err(|e| map_sqlx_error(self.kind, e))?;
                debug!(dialect = %self.kind, "disconnected");
            }
            Ok(())
        })
    }

    fn execute_raw<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [SqlValue],
    ) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move {
            let kind = self.kind;
            let conn = self.connection()?;
            debug!(sql = %sql, params = params.len(), "executing");
            let fetched = if params.is_empty() {
                conn.fetch_all(sqlx::raw_sql(sql)).await
            } else {
                conn.fetch_all(params.iter().fold(sqlx::query(sql), bind))
                    .await
            };
            let rows = fetched.map_err(|e| map_sqlx_error(kind, e))?;
            Ok(rows.iter().map(convert).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory() -> SqlxDriver {
        let mut driver = SqlxDriver::new("sqlite::memory:").unwrap();
        driver.connect().await.unwrap();
        driver
    }

    #[test]
    fn dialect_comes_from_url() {
        assert_eq!(
            SqlxDriver::new("postgres://localhost/app").unwrap().kind(),
            DialectKind::Postgres
        );
        assert_eq!(
            SqlxDriver::new("mysql://root@localhost/app").unwrap().kind(),
            DialectKind::MySql
        );
        assert!(SqlxDriver::new("oracle://db").is_err());
    }

    #[test]
    fn row_accessors() {
        let row = Row::from_pairs([
            ("name", SqlValue::Text("users".into())),
            ("notnull", SqlValue::Int(1)),
            ("is_nullable", SqlValue::Text("NO".into())),
        ]);
        assert_eq!(row.text("NAME"), Some("users"));
        assert_eq!(row.int("notnull"), Some(1));
        assert!(row.flag("notnull"));
        assert!(!row.flag("is_nullable"));
        assert!(row.get("missing").is_none());
    }

    #[tokio::test]
    async fn executes_fragments_with_parameters() {
        let mut driver = memory().await;
        driver
            .execute_raw("CREATE TABLE t (id INTEGER, name TEXT, score REAL)", &[])
            .await
            .unwrap();
        let insert = Fragment::raw("INSERT INTO t VALUES (")
            .with_param(1_i64)
            .with_raw(", ")
            .with_param("ada")
            .with_raw(", ")
            .with_param(SqlValue::Null)
            .with_raw(")");
        driver.execute(&insert).await.unwrap();

        let rows = driver
            .execute(&Fragment::raw("SELECT id, name, score FROM t WHERE id = ").with_param(1_i64))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].int("id"), Some(1));
        assert_eq!(rows[0].text("name"), Some("ada"));
        assert_eq!(rows[0].get("score"), Some(&SqlValue::Null));
        driver.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn native_errors_are_mapped() {
        let mut driver = memory().await;
        let err = driver
            .execute_raw("SELECT * FROM ghosts", &[])
            .await
            .unwrap_err();
        assert_eq!(err.query_kind(), Some(QueryErrorKind::TableNotFound));

        driver
            .execute_raw("CREATE TABLE u (email TEXT UNIQUE)", &[])
            .await
            .unwrap();
        driver
            .execute_raw("INSERT INTO u VALUES ('a')", &[])
            .await
            .unwrap();
        let err = driver
            .execute_raw("INSERT INTO u VALUES ('a')", &[])
            .await
            .unwrap_err();
        assert_eq!(err.query_kind(), Some(QueryErrorKind::UniqueViolation));
    }

    #[tokio::test]
    async fn rollback_discards_statements() {
        let mut driver = memory().await;
        driver.begin().await.unwrap();
        driver
            .execute_raw("CREATE TABLE t (id INTEGER)", &[])
            .await
            .unwrap();
        driver.rollback().await.unwrap();
        let rows = driver
            .execute_raw("SELECT name FROM sqlite_master WHERE name = 't'", &[])
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn execute_requires_connection() {
        let mut driver = SqlxDriver::new("sqlite::memory:").unwrap();
        let err = driver.execute_raw("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }
}
