//! Push configuration.
//!
//! Read from a TOML file:
//!
//! ```toml
//! dialect = "postgres"
//! url = "postgres://localhost/app"
//! schema = "schema.json"
//! strict = false
//! transaction = "auto"
//!
//! [extensions]
//! vector = true
//! postgis = false
//! ```
//!
//! Relative `schema` paths are resolved against the directory of the
//! config file.

use std::path::{Path, PathBuf};

use oxide_sqlgen::schema::SchemaSnapshot;
use oxide_sqlgen::{AdapterOptions, DialectKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::TransactionMode;
use crate::error::{PushError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushConfig {
    /// Target dialect. Guessed from the URL scheme when absent.
    pub dialect: Option<DialectKind>,
    /// Connection URL.
    pub url: Option<String>,
    /// JSON file holding the desired [`SchemaSnapshot`].
    pub schema: Option<PathBuf>,
    pub strict: bool,
    pub verbose: bool,
    pub transaction: TransactionMode,
    pub extensions: AdapterOptions,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl PushConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Fails on invalid TOML or unknown keys.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| PushError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text, path)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Loads `path`, or returns the defaults when it does not exist and
    /// `required` is false.
    ///
    /// # Errors
    ///
    /// See [`PushConfig::load`].
    pub fn load_or_default(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// The connection URL.
    ///
    /// # Errors
    ///
    /// Fails when no URL was configured.
    pub fn url(&self) -> Result<&str> {
        self.url.as_deref().ok_or_else(|| {
            PushError::Config(String::from(
                "no database url: set `url` in the config or DATABASE_URL",
            ))
        })
    }

    /// The configured dialect, or the one named by the URL scheme.
    ///
    /// # Errors
    ///
    /// Fails when neither tells the dialect.
    pub fn dialect(&self) -> Result<DialectKind> {
        if let Some(kind) = self.dialect {
            return Ok(kind);
        }
        let url = self.url()?;
        DialectKind::from_url(url)
            .ok_or_else(|| PushError::Config(format!("cannot tell the dialect of `{url}`")))
    }

    /// Path of the desired schema, resolved against the config directory.
    ///
    /// # Errors
    ///
    /// Fails when no schema path was configured.
    pub fn schema_path(&self) -> Result<PathBuf> {
        let path = self
            .schema
            .as_ref()
            .ok_or_else(|| PushError::Config(String::from("no `schema` file configured")))?;
        Ok(if path.is_absolute() {
            path.clone()
        } else {
            self.base_dir.join(path)
        })
    }

    /// Reads the desired schema.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or is not a valid snapshot.
    pub fn load_schema(&self) -> Result<SchemaSnapshot> {
        let path = self.schema_path()?;
        let text = std::fs::read_to_string(&path)?;
        let schema: SchemaSnapshot = serde_json::from_str(&text)?;
        debug!(path = %path.display(), tables = schema.tables.len(), "loaded schema");
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_full_config() {
        let config = PushConfig::from_toml(
            r#"
            dialect = "pg"
            url = "postgres://localhost/app"
            schema = "schema.json"
            strict = true
            transaction = "never"

            [extensions]
            vector = true
            "#,
            Path::new("oxide.toml"),
        )
        .unwrap();
        assert_eq!(config.dialect, Some(DialectKind::Postgres));
        assert!(config.strict);
        assert_eq!(config.transaction, TransactionMode::Never);
        assert!(config.extensions.vector);
        assert!(!config.extensions.postgis);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PushConfig::from_toml("dialekt = \"mysql\"", Path::new("oxide.toml"));
        assert!(matches!(err, Err(PushError::ConfigParse { .. })));
    }

    #[test]
    fn dialect_falls_back_to_url() {
        let config = PushConfig {
            url: Some("mysql://root@localhost/app".into()),
            ..PushConfig::default()
        };
        assert_eq!(config.dialect().unwrap(), DialectKind::MySql);
        assert!(matches!(
            PushConfig::default().dialect(),
            Err(PushError::Config(_))
        ));
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oxide.toml");
        assert_eq!(
            PushConfig::load_or_default(&path, false).unwrap(),
            PushConfig::default()
        );
        assert!(matches!(
            PushConfig::load_or_default(&path, true),
            Err(PushError::Io(_))
        ));
    }

    #[test]
    fn schema_path_is_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let schema = SchemaSnapshot::new().with_table(
            oxide_sqlgen::schema::TableSnapshot::new("users").column_def(
                oxide_sqlgen::schema::ColumnSnapshot::new(
                    "id",
                    oxide_sqlgen::schema::DataType::Integer,
                ),
            ),
        );
        std::fs::write(
            dir.path().join("schema.json"),
            serde_json::to_string(&schema).unwrap(),
        )
        .unwrap();
        let path = dir.path().join("oxide.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "url = \"sqlite::memory:\"\nschema = \"schema.json\"").unwrap();

        let config = PushConfig::load(&path).unwrap();
        assert_eq!(config.schema_path().unwrap(), dir.path().join("schema.json"));
        assert_eq!(config.load_schema().unwrap(), schema);
        assert_eq!(config.dialect().unwrap(), DialectKind::Sqlite);
    }
}
