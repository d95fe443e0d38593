//! SQLite-based version storage.

use super::{ActivationPolicy, NewVersion, VersionStorage};
use crate::models::{
    Component, ComponentType, NewTemplate, Parameter, ParameterType, Template, TemplateId,
    Version, VersionId,
};
use crate::storage::sqlite::{SqliteDatabase, sqlite_err};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::sync::Arc;

const TEMPLATE_SELECT: &str = "SELECT id, description, is_system, language, active_version, created_at, updated_at
     FROM templates";

const VERSION_SELECT: &str = "SELECT v.id, v.template_id, v.version_number, v.content, v.content_hash,
            COALESCE(t.active_version = v.version_number, 0),
            v.created_by, v.created_at, v.comment, v.source_version
     FROM versions v
     JOIN templates t ON t.id = v.template_id";

/// `SQLite`-based version storage.
pub struct SqliteVersionStorage {
    db: Arc<SqliteDatabase>,
}

impl SqliteVersionStorage {
    /// Creates a version storage over a shared database.
    #[must_use]
    pub const fn new(db: Arc<SqliteDatabase>) -> Self {
        Self { db }
    }

    /// Creates an in-memory storage (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteDatabase::in_memory()?)))
    }

    /// Returns the underlying database.
    #[must_use]
    pub const fn database(&self) -> &Arc<SqliteDatabase> {
        &self.db
    }
}

#[allow(clippy::cast_sign_loss)]
fn template_from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: TemplateId::from_trusted(row.get(0)?),
        description: row.get(1)?,
        is_system: row.get(2)?,
        language: row.get(3)?,
        active_version: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
        updated_at: row.get::<_, i64>(6)? as u64,
    })
}

#[allow(clippy::cast_sign_loss)]
fn version_from_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: VersionId::new(row.get::<_, String>(0)?),
        template_id: TemplateId::from_trusted(row.get(1)?),
        version_number: row.get(2)?,
        content: row.get(3)?,
        content_hash: row.get(4)?,
        is_active: row.get(5)?,
        created_by: row.get(6)?,
        created_at: row.get::<_, i64>(7)? as u64,
        comment: row.get(8)?,
        source_version: row.get(9)?,
    })
}

#[allow(clippy::cast_sign_loss)]
fn component_from_row(row: &Row<'_>) -> rusqlite::Result<Component> {
    let component_type: String = row.get(1)?;
    Ok(Component {
        ordinal: row.get(0)?,
        component_type: ComponentType::parse(&component_type).unwrap_or(ComponentType::Unparsed),
        name: row.get(2)?,
        content: row.get(3)?,
        content_hash: row.get(4)?,
        language: row.get(5)?,
        last_modified: row.get::<_, i64>(6)? as u64,
    })
}

fn parameter_from_row(row: &Row<'_>) -> rusqlite::Result<Parameter> {
    let parameter_type: String = row.get(0)?;
    Ok(Parameter {
        parameter_type: ParameterType::parse(&parameter_type).unwrap_or_default(),
        key: row.get(1)?,
        value: row.get(2)?,
    })
}

fn query_template(conn: &Connection, id: &TemplateId) -> Result<Option<Template>> {
    conn.query_row(
        &format!("{TEMPLATE_SELECT} WHERE id = ?1"),
        params![id.as_str()],
        template_from_row,
    )
    .optional()
    .map_err(sqlite_err("get_template"))
}

fn query_version(
    conn: &Connection,
    template_id: &TemplateId,
    version_number: u32,
) -> Result<Option<Version>> {
    conn.query_row(
        &format!("{VERSION_SELECT} WHERE v.template_id = ?1 AND v.version_number = ?2"),
        params![template_id.as_str(), version_number],
        version_from_row,
    )
    .optional()
    .map_err(sqlite_err("get_version"))
}

fn template_not_found(id: &TemplateId) -> Error {
    Error::NotFound(format!("template '{id}'"))
}

/// Swaps the active pointer if it still holds `expected`.
#[allow(clippy::cast_possible_wrap)]
fn compare_and_set_active(
    conn: &Connection,
    template_id: &TemplateId,
    version_number: u32,
    expected: Option<u32>,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE templates SET active_version = ?1, updated_at = ?2
             WHERE id = ?3 AND active_version IS ?4",
            params![
                version_number,
                crate::current_timestamp() as i64,
                template_id.as_str(),
                expected
            ],
        )
        .map_err(sqlite_err("activate_version"))?;

    if updated == 0 {
        let expected = expected.map_or_else(|| "none".to_string(), |n| format!("v{n}"));
        return Err(Error::Conflict(format!(
            "active version of template '{template_id}' is no longer {expected}"
        )));
    }
    Ok(())
}

impl VersionStorage for SqliteVersionStorage {
    #[allow(clippy::cast_possible_wrap)]
    fn create_template(&self, template: &NewTemplate) -> Result<Template> {
        self.db.write("create_template", |conn| {
            let now = crate::current_timestamp() as i64;
            conn.execute(
                "INSERT INTO templates (id, description, is_system, language, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    template.id.as_str(),
                    template.description,
                    template.is_system,
                    template.language,
                    now
                ],
            )
            .map_err(|e| match sqlite_err("create_template")(e) {
                Error::Conflict(_) => {
                    Error::Conflict(format!("template '{}' already exists", template.id))
                },
                other => other,
            })?;

            query_template(conn, &template.id)?.ok_or_else(|| template_not_found(&template.id))
        })
    }

    fn get_template(&self, id: &TemplateId) -> Result<Option<Template>> {
        self.db.read("get_template", |conn| query_template(conn, id))
    }

    fn list_templates(&self) -> Result<Vec<Template>> {
        self.db.read("list_templates", |conn| {
            let mut stmt = conn
                .prepare(&format!("{TEMPLATE_SELECT} ORDER BY id"))
                .map_err(sqlite_err("list_templates"))?;
            let rows = stmt
                .query_map([], template_from_row)
                .map_err(sqlite_err("list_templates"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_err("list_templates"))
        })
    }

    fn delete_template(&self, id: &TemplateId) -> Result<bool> {
        self.db.write("delete_template", |conn| {
            let deleted = conn
                .execute("DELETE FROM templates WHERE id = ?1", params![id.as_str()])
                .map_err(sqlite_err("delete_template"))?;
            Ok(deleted > 0)
        })
    }

    #[allow(clippy::cast_possible_wrap)]
    fn insert_version(
        &self,
        version: &NewVersion,
        activation: ActivationPolicy,
    ) -> Result<Version> {
        self.db.write("insert_version", |conn| {
            if query_template(conn, &version.template_id)?.is_none() {
                return Err(template_not_found(&version.template_id));
            }

            let next_number: u32 = conn
                .query_row(
                    "SELECT COALESCE(MAX(version_number), 0) + 1 FROM versions WHERE template_id = ?1",
                    params![version.template_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(sqlite_err("next_version_number"))?;

            conn.execute(
                "INSERT INTO versions
                 (id, template_id, version_number, content, content_hash, created_by, created_at, comment, source_version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    version.id.as_str(),
                    version.template_id.as_str(),
                    next_number,
                    version.content,
                    version.content_hash,
                    version.created_by,
                    version.created_at as i64,
                    version.comment,
                    version.source_version,
                ],
            )
            .map_err(sqlite_err("insert_version"))?;

            {
                let mut stmt = conn
                    .prepare_cached(
                        "INSERT INTO components
                         (version_id, ordinal, component_type, name, content, content_hash, language, last_modified)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )
                    .map_err(sqlite_err("insert_components"))?;
                for component in &version.components {
                    stmt.execute(params![
                        version.id.as_str(),
                        component.ordinal,
                        component.component_type.as_str(),
                        component.name,
                        component.content,
                        component.content_hash,
                        component.language,
                        component.last_modified as i64,
                    ])
                    .map_err(sqlite_err("insert_components"))?;
                }
            }

            {
                let mut stmt = conn
                    .prepare_cached(
                        "INSERT INTO parameters (version_id, key, parameter_type, value)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(sqlite_err("insert_parameters"))?;
                for parameter in &version.parameters {
                    stmt.execute(params![
                        version.id.as_str(),
                        parameter.key,
                        parameter.parameter_type.as_str(),
                        parameter.value,
                    ])
                    .map_err(sqlite_err("insert_parameters"))?;
                }
            }

            match activation {
                ActivationPolicy::IfNone => {
                    conn.execute(
                        "UPDATE templates SET active_version = ?1, updated_at = ?2
                         WHERE id = ?3 AND active_version IS NULL",
                        params![
                            next_number,
                            version.created_at as i64,
                            version.template_id.as_str()
                        ],
                    )
                    .map_err(sqlite_err("activate_first_version"))?;
                },
                ActivationPolicy::Replace { expected } => {
                    compare_and_set_active(conn, &version.template_id, next_number, expected)?;
                },
            }

            query_version(conn, &version.template_id, next_number)?.ok_or_else(|| {
                Error::NotFound(format!("version {}@{next_number}", version.template_id))
            })
        })
    }

    fn get_version(
        &self,
        template_id: &TemplateId,
        version_number: u32,
    ) -> Result<Option<Version>> {
        self.db.read("get_version", |conn| {
            query_version(conn, template_id, version_number)
        })
    }

    fn get_version_by_id(&self, id: &VersionId) -> Result<Option<Version>> {
        self.db.read("get_version_by_id", |conn| {
            conn.query_row(
                &format!("{VERSION_SELECT} WHERE v.id = ?1"),
                params![id.as_str()],
                version_from_row,
            )
            .optional()
            .map_err(sqlite_err("get_version_by_id"))
        })
    }

    fn list_versions(&self, template_id: &TemplateId) -> Result<Vec<Version>> {
        self.db.read("list_versions", |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{VERSION_SELECT} WHERE v.template_id = ?1 ORDER BY v.version_number"
                ))
                .map_err(sqlite_err("list_versions"))?;
            let rows = stmt
                .query_map(params![template_id.as_str()], version_from_row)
                .map_err(sqlite_err("list_versions"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_err("list_versions"))
        })
    }

    fn latest_version_number(&self, template_id: &TemplateId) -> Result<Option<u32>> {
        self.db.read("latest_version_number", |conn| {
            conn.query_row(
                "SELECT MAX(version_number) FROM versions WHERE template_id = ?1",
                params![template_id.as_str()],
                |row| row.get(0),
            )
            .map_err(sqlite_err("latest_version_number"))
        })
    }

    fn activate(
        &self,
        template_id: &TemplateId,
        version_number: u32,
        expected: Option<u32>,
    ) -> Result<Version> {
        self.db.write("activate_version", |conn| {
            if query_template(conn, template_id)?.is_none() {
                return Err(template_not_found(template_id));
            }
            if query_version(conn, template_id, version_number)?.is_none() {
                return Err(Error::NotFound(format!(
                    "version {version_number} of template '{template_id}'"
                )));
            }

            compare_and_set_active(conn, template_id, version_number, expected)?;

            query_version(conn, template_id, version_number)?.ok_or_else(|| {
                Error::NotFound(format!(
                    "version {version_number} of template '{template_id}'"
                ))
            })
        })
    }

    fn get_components(&self, version_id: &VersionId) -> Result<Vec<Component>> {
        self.db.read("get_components", |conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT ordinal, component_type, name, content, content_hash, language, last_modified
                     FROM components WHERE version_id = ?1 ORDER BY ordinal",
                )
                .map_err(sqlite_err("get_components"))?;
            let rows = stmt
                .query_map(params![version_id.as_str()], component_from_row)
                .map_err(sqlite_err("get_components"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_err("get_components"))
        })
    }

    fn get_parameters(&self, version_id: &VersionId) -> Result<Vec<Parameter>> {
        self.db.read("get_parameters", |conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT parameter_type, key, value
                     FROM parameters WHERE version_id = ?1 ORDER BY key",
                )
                .map_err(sqlite_err("get_parameters"))?;
            let rows = stmt
                .query_map(params![version_id.as_str()], parameter_from_row)
                .map_err(sqlite_err("get_parameters"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sqlite_err("get_parameters"))
        })
    }
}
