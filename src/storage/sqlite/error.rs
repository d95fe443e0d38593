//! Mapping of `rusqlite` errors onto crate errors.

use crate::Error;
use rusqlite::ErrorCode;
use rusqlite::ffi;

/// Maps a `rusqlite` error raised by `operation` onto [`Error`].
///
/// Lock contention and uniqueness violations surface as [`Error::Conflict`]
/// so callers can retry. Everything else is a [`Error::Storage`] failure.
pub fn map_sqlite_error(operation: &str, err: &rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                return Error::Conflict(format!(
                    "{operation}: database is locked by another writer"
                ));
            },
            ErrorCode::ConstraintViolation
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                return Error::Conflict(format!("{operation}: {err}"));
            },
            _ => {},
        }
    }

    Error::Storage {
        operation: operation.to_string(),
        cause: err.to_string(),
    }
}

/// Returns a `map_err` adapter for `operation`.
pub fn sqlite_err(operation: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| map_sqlite_error(operation, &e)
}
