//! Storage layer.
//!
//! Two traits sit at the persistence seam:
//! - [`VersionStorage`]: templates, immutable versions, components, parameters
//!   and the active-version pointer
//! - [`ChangeLogStorage`]: the append-only change log
//!
//! Both `SQLite` backends share one [`sqlite::SqliteDatabase`] so writes are
//! serialized through a single connection and template deletion cascades.

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]
// Allow match_same_arms for explicit enum handling.
#![allow(clippy::match_same_arms)]

pub mod change_log;
pub mod sqlite;
pub mod version;

pub use change_log::{ChangeLogStorage, SqliteChangeLogStorage};
pub use sqlite::SqliteDatabase;
pub use version::{ActivationPolicy, NewVersion, SqliteVersionStorage, VersionStorage};
