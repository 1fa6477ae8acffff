//! Schema snapshots, diffing and migration planning.
//!
//! A migration runs in four pure steps before anything touches a
//! database:
//!
//! 1. [`diff`] compares a desired [`SchemaSnapshot`] against the current one
//!    and yields [`DiffOperation`]s plus [`AmbiguousChange`]s for
//!    drop/add pairs that may be renames.
//! 2. A [`MigrationPlan`] takes a [`Decision`] for each ambiguity and
//!    re-diffs until none are left.
//! 3. Destructive operations are listed for confirmation.
//! 4. The plan renders through a dialect into DDL fragments.

mod diff;
mod operation;
mod plan;
mod report;
mod snapshot;
mod types;

pub use diff::{diff, diff_declining, AmbiguousChange, SchemaDiff};
pub use operation::{AlterColumnChange, DiffOperation, Phase};
pub use plan::{Decision, MigrationPlan};
pub use report::{grouped, ReportSection};
pub use snapshot::{
    ColumnSnapshot, ForeignKeySnapshot, Generated, IndexSnapshot, PrimaryKey, SchemaSnapshot,
    TableSnapshot, UniqueConstraint,
};
pub use types::{DataType, DefaultValue, ForeignKeyAction};
