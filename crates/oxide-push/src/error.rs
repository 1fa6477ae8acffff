//! Error types for the push workflow.

use std::path::PathBuf;

/// Errors that can occur while pushing a schema.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Compilation, migration rendering or a mapped driver failure.
    #[error(transparent)]
    Sql(#[from] oxide_sqlgen::Error),

    /// The user cancelled at a prompt. Nothing was executed.
    #[error("Cancelled by user")]
    Cancelled,

    /// Destructive or strict-mode confirmation was declined.
    #[error("Aborted: {0}")]
    Aborted(String),

    /// The resolver returned without deciding a pending change.
    #[error("No decision for ambiguous change: {0}")]
    UnresolvedChange(String),

    /// A statement failed while applying; later statements were skipped.
    #[error("Statement {index} of {total} failed: {source}\n  SQL: {sql}")]
    Apply {
        /// 1-based position of the failing statement.
        index: usize,
        /// Number of statements in the run.
        total: usize,
        /// The statement text.
        sql: String,
        /// The mapped driver error.
        source: oxide_sqlgen::Error,
    },

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read the configuration file.
    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },

    /// IO error (reading config or schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the desired schema.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PushError {
    /// `true` when the user stopped the run, which the CLI treats as
    /// success.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Aborted(_))
    }
}

/// Result type for push operations.
pub type Result<T> = std::result::Result<T, PushError>;
