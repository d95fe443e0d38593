//! Shared `SQLite` infrastructure for storage backends.
//!
//! ## Module Structure
//!
//! - [`connection`]: the shared [`SqliteDatabase`] handle, lock acquisition and configuration
//! - [`schema`]: embedded migrations tracked through `PRAGMA user_version`
//! - [`error`]: mapping of `rusqlite` errors onto [`crate::Error`]
//! - [`metrics`]: shared metrics recording helpers
//!
//! The version and change-log backends hold the same [`SqliteDatabase`], so
//! writes from both are serialized through one connection and template deletion
//! cascades through foreign keys.

mod connection;
mod error;
mod metrics;
mod schema;

pub use connection::{
    BUSY_TIMEOUT_MS, DatabaseStats, SqliteDatabase, acquire_lock, configure_connection,
};
pub use error::{map_sqlite_error, sqlite_err};
pub use metrics::record_operation_metrics;
pub use schema::{MIGRATIONS, Migration, latest_version, run_migrations};
