//! SQLite-based change log storage.

use super::ChangeLogStorage;
use crate::models::{Change, ChangeType, NewChange, TemplateId};
use crate::storage::sqlite::{SqliteDatabase, sqlite_err};
use crate::{Error, Result};
use rusqlite::{Row, params};
use std::sync::Arc;

const CHANGE_SELECT: &str = "SELECT id, template_id, from_version, to_version, change_type, field_name,
            old_value, new_value, change_summary, changed_at
     FROM changes";

/// `SQLite`-based change log storage.
pub struct SqliteChangeLogStorage {
    db: Arc<SqliteDatabase>,
}

impl SqliteChangeLogStorage {
    /// Creates a change log storage over a shared database.
    #[must_use]
    pub const fn new(db: Arc<SqliteDatabase>) -> Self {
        Self { db }
    }

    fn query(
        &self,
        operation: &'static str,
        filter: &str,
        template_id: &TemplateId,
        to_version: u32,
    ) -> Result<Vec<Change>> {
        self.db.read(operation, |conn| {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "{CHANGE_SELECT} WHERE template_id = ?1 AND {filter} ORDER BY to_version, id"
                ))
                .map_err(sqlite_err(operation))?;
            let rows = stmt
                .query_map(params![template_id.as_str(), to_version], change_from_row)
                .map_err(sqlite_err(operation))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_err(operation))
        })
    }
}

#[allow(clippy::cast_sign_loss)]
fn change_from_row(row: &Row<'_>) -> rusqlite::Result<Change> {
    let change_type: String = row.get(4)?;
    Ok(Change {
        id: row.get(0)?,
        template_id: TemplateId::from_trusted(row.get(1)?),
        from_version: row.get(2)?,
        to_version: row.get(3)?,
        change_type: ChangeType::parse(&change_type).unwrap_or(ChangeType::Updated),
        field_name: row.get(5)?,
        old_value: row.get(6)?,
        new_value: row.get(7)?,
        change_summary: row.get(8)?,
        changed_at: row.get::<_, i64>(9)? as u64,
    })
}

impl ChangeLogStorage for SqliteChangeLogStorage {
    #[allow(clippy::cast_possible_wrap)]
    fn append(&self, changes: &[NewChange]) -> Result<Vec<Change>> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        self.db.write("append_changes", |conn| {
            let now = crate::current_timestamp();
            let mut stmt = conn
                .prepare_cached(
                    "INSERT INTO changes
                     (template_id, from_version, to_version, change_type, field_name,
                      old_value, new_value, change_summary, changed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(sqlite_err("append_changes"))?;

            let mut stored = Vec::with_capacity(changes.len());
            for change in changes {
                stmt.execute(params![
                    change.template_id.as_str(),
                    change.from_version,
                    change.to_version,
                    change.change_type.as_str(),
                    change.field_name,
                    change.old_value,
                    change.new_value,
                    change.change_summary,
                    now as i64,
                ])
                .map_err(|e| match sqlite_err("append_changes")(e) {
                    Error::Storage { cause, .. } if cause.contains("FOREIGN KEY") => {
                        Error::NotFound(format!("template '{}'", change.template_id))
                    },
                    other => other,
                })?;

                stored.push(Change {
                    id: conn.last_insert_rowid(),
                    template_id: change.template_id.clone(),
                    from_version: change.from_version,
                    to_version: change.to_version,
                    change_type: change.change_type,
                    field_name: change.field_name.clone(),
                    old_value: change.old_value.clone(),
                    new_value: change.new_value.clone(),
                    change_summary: change.change_summary.clone(),
                    changed_at: now,
                });
            }
            Ok(stored)
        })
    }

    fn changes_to(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>> {
        self.query("changes_to", "to_version = ?2", template_id, to_version)
    }

    fn changes_through(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>> {
        self.query("changes_through", "to_version <= ?2", template_id, to_version)
    }

    fn recorded_versions(&self, template_id: &TemplateId) -> Result<Vec<u32>> {
        self.db.read("recorded_versions", |conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT DISTINCT to_version FROM changes WHERE template_id = ?1 ORDER BY to_version",
                )
                .map_err(sqlite_err("recorded_versions"))?;
            let rows = stmt
                .query_map(params![template_id.as_str()], |row| row.get(0))
                .map_err(sqlite_err("recorded_versions"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_err("recorded_versions"))
        })
    }
}
