//! Shared connection handling for `SQLite` backends.
//!
//! Both the version backend and the change-log backend operate on one
//! [`SqliteDatabase`], so template deletion can cascade across all tables
//! through foreign keys.

use super::error::sqlite_err;
use super::metrics::record_operation_metrics;
use super::schema::{MIGRATIONS, run_migrations};
use crate::{Error, Result};
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Busy timeout applied to every connection.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (a previous critical section panicked), the inner
/// value is recovered and a warning logged. `SQLite` rolls back any transaction
/// left open by the panicking holder, so the connection is still consistent.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection.
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: balances durability with performance
/// - **`busy_timeout`**: waits for locks instead of failing immediately
/// - **`foreign_keys`**: required for template deletion to cascade
///
/// # Errors
///
/// Returns [`Error::Storage`] if the busy timeout or foreign keys cannot be set.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row ("wal" or "memory"), so the result is ignored
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.busy_timeout(Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))
        .map_err(sqlite_err("set_busy_timeout"))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(sqlite_err("enable_foreign_keys"))?;
    Ok(())
}

/// A `SQLite` database shared by the storage backends.
pub struct SqliteDatabase {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database.
    db_path: PathBuf,
}

impl SqliteDatabase {
    /// Opens (or creates) a database file and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or migrated.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage {
                operation: "create_db_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        let conn = Connection::open(&db_path).map_err(sqlite_err("open_db"))?;
        Self::initialize(conn, db_path)
    }

    /// Creates an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sqlite_err("open_db_memory"))?;
        Self::initialize(conn, PathBuf::from(":memory:"))
    }

    fn initialize(mut conn: Connection, db_path: PathBuf) -> Result<Self> {
        configure_connection(&conn)?;
        let applied = run_migrations(&mut conn, MIGRATIONS)?;
        tracing::debug!(path = %db_path.display(), schema_version = applied, "Opened version database");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Returns the default database path.
    ///
    /// Returns `<data_dir>/promptvc/promptvc.db` (e.g. `~/.local/share/promptvc/promptvc.db`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.data_dir().join("promptvc").join("promptvc.db"))
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs a read-only closure against the connection.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn read<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let conn = acquire_lock(&self.conn);
        let result = f(&conn);
        drop(conn);
        record_operation_metrics(operation, start, status_of(&result));
        result
    }

    /// Runs a closure inside an `IMMEDIATE` transaction.
    ///
    /// The write lock is taken when the transaction begins, so concurrent
    /// writers are serialized and read-then-write sequences inside `f` are
    /// atomic. The transaction commits only if `f` succeeds; otherwise it is
    /// rolled back on drop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the database stayed locked past the busy
    /// timeout, or propagates the closure's error.
    pub fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let mut conn = acquire_lock(&self.conn);
        let result = (|| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(sqlite_err(operation))?;
            let value = f(&tx)?;
            tx.commit().map_err(sqlite_err(operation))?;
            Ok(value)
        })();
        drop(conn);
        record_operation_metrics(operation, start, status_of(&result));
        result
    }

    /// Returns the applied schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the pragma cannot be read.
    pub fn schema_version(&self) -> Result<u32> {
        self.read("schema_version", |conn| {
            conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))
                .map_err(sqlite_err("schema_version"))
        })
    }

    /// Returns database statistics for monitoring.
    ///
    /// # Errors
    ///
    /// Returns an error if the counts cannot be queried.
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.read("db_stats", |conn| {
            let count = |sql: &str| -> Result<u64> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| u64::try_from(n).unwrap_or(0))
                    .map_err(sqlite_err("db_stats"))
            };
            let page_count: i64 = conn
                .pragma_query_value(None, "page_count", |row| row.get(0))
                .unwrap_or(0);
            let page_size: i64 = conn
                .pragma_query_value(None, "page_size", |row| row.get(0))
                .unwrap_or(4096);

            Ok(DatabaseStats {
                template_count: count("SELECT COUNT(*) FROM templates")?,
                version_count: count("SELECT COUNT(*) FROM versions")?,
                change_count: count("SELECT COUNT(*) FROM changes")?,
                db_size_bytes: u64::try_from(page_count.saturating_mul(page_size)).unwrap_or(0),
            })
        })
    }
}

/// Database statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DatabaseStats {
    /// Number of templates.
    pub template_count: u64,
    /// Total number of versions.
    pub version_count: u64,
    /// Total number of change-log rows.
    pub change_count: u64,
    /// Database size in bytes.
    pub db_size_bytes: u64,
}

const fn status_of<T>(result: &Result<T>) -> &'static str {
    if result.is_ok() { "success" } else { "error" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_lock_concurrent() {
        let mutex = Arc::new(Mutex::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let mutex_clone = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                let mut guard = acquire_lock(&mutex_clone);
                *guard += 1;
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*acquire_lock(&mutex), 10);
    }

    #[test]
    fn test_configure_connection() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let foreign_keys: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);

        let busy_timeout: u32 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, BUSY_TIMEOUT_MS);
    }

    #[test]
    fn test_in_memory_database_is_migrated() {
        let db = SqliteDatabase::in_memory().unwrap();
        assert_eq!(db.db_path().to_str(), Some(":memory:"));
        assert_eq!(db.schema_version().unwrap(), crate::storage::sqlite::latest_version());
        assert_eq!(db.stats().unwrap().template_count, 0);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let db = SqliteDatabase::in_memory().unwrap();
        let result: Result<()> = db.write("test_rollback", |conn| {
            conn.execute(
                "INSERT INTO templates (id, created_at, updated_at) VALUES ('demo', 0, 0)",
                [],
            )
            .map_err(sqlite_err("test_insert"))?;
            Err(Error::InvalidInput("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(db.stats().unwrap().template_count, 0);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("promptvc.db");
        let db = SqliteDatabase::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.db_path(), path.as_path());
    }

    #[test]
    fn test_default_path() {
        if let Some(p) = SqliteDatabase::default_path() {
            assert!(p.to_string_lossy().ends_with("promptvc.db"));
        }
    }
}
