//! Embedded schema migrations.
//!
//! Migrations are applied in order at open time. The applied version is kept in
//! `PRAGMA user_version`, and each migration runs in its own transaction
//! together with the version bump, so a failed statement leaves the schema at
//! the previous version.

use super::error::sqlite_err;
use crate::{Error, Result};
use rusqlite::Connection;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: u32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// Schema of the version database.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Templates, versions, components and parameters",
        sql: r"
            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL DEFAULT '',
                is_system INTEGER NOT NULL DEFAULT 0,
                language TEXT NOT NULL DEFAULT 'en',
                active_version INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS versions (
                id TEXT PRIMARY KEY,
                template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
                version_number INTEGER NOT NULL CHECK (version_number >= 1),
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                comment TEXT,
                source_version INTEGER,
                UNIQUE (template_id, version_number)
            );

            CREATE TABLE IF NOT EXISTS components (
                version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
                ordinal INTEGER NOT NULL,
                component_type TEXT NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                language TEXT NOT NULL,
                last_modified INTEGER NOT NULL,
                PRIMARY KEY (version_id, component_type, name)
            );

            CREATE TABLE IF NOT EXISTS parameters (
                version_id TEXT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
                key TEXT NOT NULL,
                parameter_type TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (version_id, key)
            );

            CREATE TRIGGER IF NOT EXISTS versions_immutable
            BEFORE UPDATE ON versions
            BEGIN
                SELECT RAISE(ABORT, 'versions are immutable');
            END;
        ",
    },
    Migration {
        version: 2,
        description: "Append-only change log",
        sql: r"
            CREATE TABLE IF NOT EXISTS changes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                template_id TEXT NOT NULL REFERENCES templates(id) ON DELETE CASCADE,
                from_version INTEGER,
                to_version INTEGER NOT NULL,
                change_type TEXT NOT NULL,
                field_name TEXT NOT NULL,
                old_value TEXT,
                new_value TEXT,
                change_summary TEXT,
                changed_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_changes_template_to
                ON changes(template_id, to_version);

            CREATE TRIGGER IF NOT EXISTS changes_append_only
            BEFORE UPDATE ON changes
            BEGIN
                SELECT RAISE(ABORT, 'changes are append-only');
            END;
        ",
    },
];

/// Returns the schema version after all migrations are applied.
#[must_use]
pub fn latest_version() -> u32 {
    MIGRATIONS.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Applies all pending migrations, returning the resulting schema version.
///
/// # Errors
///
/// Returns [`Error::Storage`] if a migration fails, or if the database was
/// written by a newer schema than this build knows.
pub fn run_migrations(conn: &mut Connection, migrations: &[Migration]) -> Result<u32> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(sqlite_err("read_schema_version"))?;

    let known = migrations.iter().map(|m| m.version).max().unwrap_or(0);
    if current > known {
        return Err(Error::Storage {
            operation: "run_migrations".to_string(),
            cause: format!("database schema version {current} is newer than supported {known}"),
        });
    }

    let mut applied = current;
    for migration in migrations.iter().filter(|m| m.version > current) {
        let tx = conn.transaction().map_err(sqlite_err("begin_migration"))?;
        tx.execute_batch(migration.sql)
            .map_err(sqlite_err("apply_migration"))?;
        tx.pragma_update(None, "user_version", migration.version)
            .map_err(sqlite_err("apply_migration"))?;
        tx.commit().map_err(sqlite_err("commit_migration"))?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied schema migration"
        );
        applied = migration.version;
    }

    Ok(applied)
}
