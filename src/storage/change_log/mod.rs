//! Change log storage.

mod sqlite;
mod traits;

pub use sqlite::SqliteChangeLogStorage;
pub use traits::ChangeLogStorage;
