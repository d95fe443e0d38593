//! Version storage.
//!
//! Templates, their immutable versions and the per-version components and
//! parameters. The active-version pointer lives on the template row.

mod sqlite;
mod traits;

pub use sqlite::SqliteVersionStorage;
pub use traits::{ActivationPolicy, NewVersion, VersionStorage};
