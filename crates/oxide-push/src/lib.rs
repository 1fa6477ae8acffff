//! # oxide-push
//!
//! Pushes a desired schema snapshot to a live PostgreSQL, MySQL or SQLite
//! database: introspect, diff, resolve renames, confirm data loss, render
//! and execute.
//!
//! The [`PushEngine`] talks to the database only through a [`Driver`] and
//! to the user only through a [`Resolver`] and a [`Confirm`], so a whole
//! push can be scripted in tests against an in-memory SQLite database.

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod introspect;
pub mod prompt;

pub use config::PushConfig;
pub use driver::{BoxFuture, Driver, Row, SqlxDriver};
pub use engine::{
    Confirm, PushEngine, PushOutcome, Resolution, Resolver, RunOptions, TransactionMode,
};
pub use error::{PushError, Result};
pub use introspect::introspect;
pub use prompt::TerminalPrompt;
