//! Prompt version service.
//!
//! Wires the version store, diff engine, change tracker and rollback
//! controller over one shared database, and is the entry point used by the
//! CLI and by embedding applications.

use std::sync::Arc;

use super::{ChangeTracker, DiffEngine, RollbackController, VersionDraft, VersionStore};
use crate::config::{PromptVcConfig, VersioningSettings};
use crate::models::{
    Change, Component, NewTemplate, Parameter, Template, TemplateId, Version, VersionDiff,
    VersionId,
};
use crate::storage::sqlite::DatabaseStats;
use crate::storage::{
    ChangeLogStorage, SqliteChangeLogStorage, SqliteDatabase, SqliteVersionStorage,
    VersionStorage,
};
use crate::Result;

/// Facade over all prompt versioning operations.
pub struct PromptVersionService {
    db: Arc<SqliteDatabase>,
    store: Arc<VersionStore>,
    diff: Arc<DiffEngine>,
    tracker: Arc<ChangeTracker>,
    rollback: RollbackController,
    settings: VersioningSettings,
}

impl PromptVersionService {
    /// Opens the database named by `config`, creating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database path cannot be resolved or opened.
    pub fn open(config: &PromptVcConfig) -> Result<Self> {
        let path = config.db_path()?;
        let db = SqliteDatabase::open(path.clone())?;
        tracing::debug!(path = %path.display(), "Opened version database");
        Ok(Self::from_database(Arc::new(db), config.versioning.clone()))
    }

    /// Creates a service over a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_database(
            Arc::new(SqliteDatabase::in_memory()?),
            VersioningSettings::default(),
        ))
    }

    /// Creates a service over an existing database.
    #[must_use]
    pub fn from_database(db: Arc<SqliteDatabase>, settings: VersioningSettings) -> Self {
        let storage: Arc<dyn VersionStorage> = Arc::new(SqliteVersionStorage::new(Arc::clone(&db)));
        let log: Arc<dyn ChangeLogStorage> = Arc::new(SqliteChangeLogStorage::new(Arc::clone(&db)));

        let store = Arc::new(VersionStore::new(Arc::clone(&storage)));
        let diff = Arc::new(DiffEngine::with_cache_capacity(
            storage,
            settings.diff_cache_capacity,
        ));
        let tracker = Arc::new(ChangeTracker::new(log, Arc::clone(&store), Arc::clone(&diff)));
        let rollback = RollbackController::new(Arc::clone(&store), Arc::clone(&tracker));

        Self {
            db,
            store,
            diff,
            tracker,
            rollback,
            settings,
        }
    }

    /// Returns the versioning settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &VersioningSettings {
        &self.settings
    }

    /// Returns the version store.
    #[must_use]
    pub const fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    /// Returns the diff engine.
    #[must_use]
    pub const fn diff_engine(&self) -> &Arc<DiffEngine> {
        &self.diff
    }

    /// Starts a template request using the configured default language.
    #[must_use]
    pub fn new_template(&self, id: TemplateId) -> NewTemplate {
        NewTemplate::new(id).with_language(self.settings.default_language.clone())
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Creates a template.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if the template already exists.
    pub fn create_template(&self, template: NewTemplate) -> Result<Template> {
        self.store.create_template(template)
    }

    /// Gets a template.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist.
    pub fn get_template(&self, template_id: &TemplateId) -> Result<Template> {
        self.store.get_template(template_id)
    }

    /// Lists all templates ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        self.store.list_templates()
    }

    /// Deletes a template with its versions and change log.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist.
    pub fn delete_template(&self, template_id: &TemplateId) -> Result<()> {
        self.store.delete_template(template_id)
    }

    // ========================================================================
    // Versions
    // ========================================================================

    /// Creates a new version.
    ///
    /// When change recording is enabled, the changes from the previous version
    /// are appended to the change log. A failure to record them is logged and
    /// does not undo the version; `regenerate_changes` fills the gap later.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist, or
    /// [`crate::Error::InvalidInput`] if `created_by` is blank.
    pub fn create_version(
        &self,
        template_id: &TemplateId,
        content: &str,
        created_by: &str,
        parameters: &[Parameter],
    ) -> Result<Version> {
        self.create_version_from(
            template_id,
            VersionDraft::new(content, created_by).with_parameters(parameters.to_vec()),
        )
    }

    /// Creates a new version from a draft.
    ///
    /// # Errors
    ///
    /// See [`PromptVersionService::create_version`].
    pub fn create_version_from(
        &self,
        template_id: &TemplateId,
        draft: VersionDraft,
    ) -> Result<Version> {
        let version = self.store.create_version_from(template_id, draft)?;

        if self.settings.record_changes_on_create && version.version_number > 1 {
            let previous = version.version_number - 1;
            if let Err(e) = self
                .tracker
                .record_changes(template_id, previous, version.version_number)
            {
                tracing::warn!(
                    template_id = %template_id,
                    version = version.version_number,
                    error = %e,
                    "Failed to record changes for new version"
                );
            }
        }

        Ok(version)
    }

    /// Gets a version by number.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or version does not exist.
    pub fn get_version(&self, template_id: &TemplateId, version_number: u32) -> Result<Version> {
        self.store.get_version(template_id, version_number)
    }

    /// Gets a version by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the version does not exist.
    pub fn get_version_by_id(&self, version_id: &VersionId) -> Result<Version> {
        self.store.get_version_by_id(version_id)
    }

    /// Lists all versions of a template in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist.
    pub fn list_versions(&self, template_id: &TemplateId) -> Result<Vec<Version>> {
        self.store.list_versions(template_id)
    }

    /// Gets the active version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist or has
    /// no versions.
    pub fn get_active_version(&self, template_id: &TemplateId) -> Result<Version> {
        self.store.get_active_version(template_id)
    }

    /// Gets a version's components in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    pub fn get_components(&self, version_id: &VersionId) -> Result<Vec<Component>> {
        self.store.get_components(version_id)
    }

    /// Gets a version's parameters ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    pub fn get_parameters(&self, version_id: &VersionId) -> Result<Vec<Parameter>> {
        self.store.get_parameters(version_id)
    }

    // ========================================================================
    // Diffs and change log
    // ========================================================================

    /// Compares two versions of a template.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or either version
    /// does not exist.
    pub fn compare(
        &self,
        template_id: &TemplateId,
        from_version: u32,
        to_version: u32,
    ) -> Result<VersionDiff> {
        self.diff.compare(template_id, from_version, to_version)
    }

    /// Records the changes between two versions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or either version
    /// does not exist.
    pub fn record_changes(
        &self,
        template_id: &TemplateId,
        from_version: u32,
        to_version: u32,
    ) -> Result<Vec<Change>> {
        self.tracker.record_changes(template_id, from_version, to_version)
    }

    /// Gets the changes recorded into `to_version`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or version does not exist.
    pub fn get_changes(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>> {
        self.tracker.get_changes(template_id, to_version)
    }

    /// Gets the recorded change log for all versions up to `to_version`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or version does not exist.
    pub fn history(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>> {
        self.tracker.history(template_id, to_version)
    }

    /// Rebuilds missing change-log entries from stored versions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist.
    pub fn regenerate_changes(&self, template_id: &TemplateId) -> Result<Vec<Change>> {
        self.tracker.regenerate(template_id)
    }

    // ========================================================================
    // Activation and rollback
    // ========================================================================

    /// Soft rollback: makes `version_number` the active version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown template or version,
    /// or [`crate::Error::Conflict`] if another activation is in flight.
    pub fn activate(&self, template_id: &TemplateId, version_number: u32) -> Result<Version> {
        self.rollback.activate(template_id, version_number)
    }

    /// Hard rollback: copies `version_number` into a new active version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown template or version,
    /// or [`crate::Error::Conflict`] if another activation is in flight.
    pub fn rollback_hard(
        &self,
        template_id: &TemplateId,
        version_number: u32,
        comment: Option<&str>,
        created_by: &str,
    ) -> Result<Version> {
        self.rollback
            .rollback_hard(template_id, version_number, comment, created_by)
    }

    /// Returns row counts and database size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be queried.
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::{ChangeType, LineChangeType};

    fn service() -> (PromptVersionService, TemplateId) {
        let service = PromptVersionService::in_memory().unwrap();
        let id = TemplateId::new("demo").unwrap();
        service.create_template(service.new_template(id.clone())).unwrap();
        (service, id)
    }

    #[test]
    fn test_demo_scenario() {
        let (service, id) = service();

        let v1 = service.create_version(&id, "A\nB\nC", "alice", &[]).unwrap();
        assert_eq!(v1.version_number, 1);
        assert!(v1.is_active);

        let v2 = service.create_version(&id, "A\nX\nC", "alice", &[]).unwrap();
        assert_eq!(v2.version_number, 2);
        assert!(!v2.is_active);

        let diff = service.compare(&id, 1, 2).unwrap();
        assert_eq!(diff.components.len(), 1);
        assert_eq!(diff.components[0].change_type, ChangeType::Updated);
        assert_eq!(diff.components[0].lines.len(), 1);
        let line = &diff.components[0].lines[0];
        assert_eq!(line.change_type, LineChangeType::Modified);
        assert_eq!(line.line_number, Some(2));
        assert_eq!(line.old_text.as_deref(), Some("B"));
        assert_eq!(line.new_text.as_deref(), Some("X"));

        let v3 = service.rollback_hard(&id, 1, None, "alice").unwrap();
        assert_eq!(v3.version_number, 3);
        assert_eq!(v3.content, "A\nB\nC");
        assert!(v3.is_active);

        let v2 = service.get_version(&id, 2).unwrap();
        assert!(!v2.is_active);
        assert_eq!(service.get_active_version(&id).unwrap().version_number, 3);
    }

    #[test]
    fn test_create_records_changes() {
        let (service, id) = service();
        service.create_version(&id, "one", "alice", &[]).unwrap();
        service.create_version(&id, "two", "alice", &[]).unwrap();

        let changes = service.get_changes(&id, 2).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from_version, Some(1));
        assert!(service.get_changes(&id, 1).unwrap().is_empty());
        assert!(service.regenerate_changes(&id).unwrap().is_empty());
    }

    #[test]
    fn test_recording_disabled() {
        let settings = VersioningSettings {
            record_changes_on_create: false,
            diff_cache_capacity: 0,
            ..VersioningSettings::default()
        };
        let service = PromptVersionService::from_database(
            Arc::new(SqliteDatabase::in_memory().unwrap()),
            settings,
        );
        let id = TemplateId::new("demo").unwrap();
        service.create_template(NewTemplate::new(id.clone())).unwrap();
        service.create_version(&id, "one", "alice", &[]).unwrap();
        service.create_version(&id, "two", "alice", &[]).unwrap();

        assert!(service.get_changes(&id, 2).unwrap().is_empty());
        assert_eq!(service.regenerate_changes(&id).unwrap().len(), 1);
        assert_eq!(service.diff_engine().cached_len(), 0);
    }

    #[test]
    fn test_unknown_template() {
        let (service, _) = service();
        let missing = TemplateId::new("missing").unwrap();
        assert!(matches!(
            service.create_version(&missing, "x", "alice", &[]),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(service.list_versions(&missing), Err(Error::NotFound(_))));
        assert!(matches!(service.get_active_version(&missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_stats() {
        let (service, id) = service();
        service.create_version(&id, "one", "alice", &[]).unwrap();
        service.create_version(&id, "two", "alice", &[]).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.template_count, 1);
        assert_eq!(stats.version_count, 2);
        assert_eq!(stats.change_count, 1);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PromptVcConfig::new().with_db_path(dir.path().join("db").join("p.db"));
        let id = TemplateId::new("demo").unwrap();

        {
            let service = PromptVersionService::open(&config).unwrap();
            service.create_template(NewTemplate::new(id.clone())).unwrap();
            service.create_version(&id, "persisted", "alice", &[]).unwrap();
        }

        let service = PromptVersionService::open(&config).unwrap();
        assert_eq!(service.get_active_version(&id).unwrap().content, "persisted");
    }
}
