//! Version store service.
//!
//! Creates immutable versions (splitting content into components on the way
//! in), lists and retrieves them, and moves the active-version pointer.

use std::sync::Arc;
use tracing::instrument;

use super::{ComponentSplitter, ContentHasher};
use crate::models::{
    Component, NewTemplate, Parameter, Template, TemplateId, Version, VersionId,
    normalize_parameters,
};
use crate::storage::{ActivationPolicy, NewVersion, VersionStorage};
use crate::{Error, Result};

/// Content and metadata for a version about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDraft {
    /// Full raw content.
    pub content: String,
    /// Author.
    pub created_by: String,
    /// Parameters; duplicate keys keep the last value.
    pub parameters: Vec<Parameter>,
    /// Optional note.
    pub comment: Option<String>,
}

impl VersionDraft {
    /// Creates a draft without parameters or comment.
    #[must_use]
    pub fn new(content: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            created_by: created_by.into(),
            parameters: Vec::new(),
            comment: None,
        }
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Vec<Parameter>>) -> Self {
        self.parameters = parameters.into();
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Service for templates and their versions.
pub struct VersionStore {
    storage: Arc<dyn VersionStorage>,
}

impl VersionStore {
    /// Creates a version store over a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn VersionStorage>) -> Self {
        Self { storage }
    }

    /// Returns the storage backend.
    #[must_use]
    pub const fn storage(&self) -> &Arc<dyn VersionStorage> {
        &self.storage
    }

    /// Creates a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the template already exists.
    #[instrument(skip(self, template), fields(template_id = %template.id))]
    pub fn create_template(&self, template: NewTemplate) -> Result<Template> {
        let created = self.storage.create_template(&template)?;
        tracing::info!(template_id = %created.id, "Created template");
        Ok(created)
    }

    /// Gets a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist.
    pub fn get_template(&self, template_id: &TemplateId) -> Result<Template> {
        self.storage
            .get_template(template_id)?
            .ok_or_else(|| Error::NotFound(format!("template '{template_id}'")))
    }

    /// Lists all templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        self.storage.list_templates()
    }

    /// Deletes a template and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist.
    #[instrument(skip(self, template_id), fields(template_id = %template_id))]
    pub fn delete_template(&self, template_id: &TemplateId) -> Result<()> {
        if !self.storage.delete_template(template_id)? {
            return Err(Error::NotFound(format!("template '{template_id}'")));
        }
        tracing::info!(template_id = %template_id, "Deleted template");
        Ok(())
    }

    /// Creates a new version of a template.
    ///
    /// The first version of a template becomes active; later versions leave
    /// the active pointer unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist, or
    /// [`Error::InvalidInput`] if `created_by` is blank.
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
    /// See [`VersionStore::create_version`].
    #[instrument(skip(self, template_id, draft), fields(template_id = %template_id, created_by = %draft.created_by))]
    pub fn create_version_from(
        &self,
        template_id: &TemplateId,
        draft: VersionDraft,
    ) -> Result<Version> {
        self.insert(template_id, draft, None, ActivationPolicy::IfNone)
    }

    /// Persists a draft with an explicit activation policy.
    pub(crate) fn insert(
        &self,
        template_id: &TemplateId,
        draft: VersionDraft,
        source_version: Option<u32>,
        activation: ActivationPolicy,
    ) -> Result<Version> {
        let created_by = draft.created_by.trim();
        if created_by.is_empty() {
            return Err(Error::InvalidInput(
                "Version author cannot be empty".to_string(),
            ));
        }

        let template = self.get_template(template_id)?;
        let created_at = crate::current_timestamp();

        let outcome = ComponentSplitter::split(&draft.content, &template.language, created_at);
        for issue in &outcome.issues {
            let err = issue.to_error();
            tracing::warn!(template_id = %template_id, error = %err, "Template content issue");
        }

        let request = NewVersion {
            id: VersionId::generate(),
            template_id: template_id.clone(),
            content_hash: ContentHasher::hash(&draft.content),
            content: draft.content,
            created_by: created_by.to_string(),
            created_at,
            comment: draft.comment.filter(|c| !c.trim().is_empty()),
            source_version,
            components: outcome.components,
            parameters: normalize_parameters(&draft.parameters),
        };

        let version = self.storage.insert_version(&request, activation)?;
        tracing::info!(
            template_id = %template_id,
            version = version.version_number,
            active = version.is_active,
            components = request.components.len(),
            "Created version"
        );
        Ok(version)
    }

    /// Makes `version_number` the active version.
    ///
    /// Re-activating the active version succeeds without a write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown template or version, or
    /// [`Error::Conflict`] if the active pointer moved concurrently.
    #[instrument(skip(self, template_id), fields(template_id = %template_id))]
    pub fn activate_version(&self, template_id: &TemplateId, version_number: u32) -> Result<Version> {
        let template = self.get_template(template_id)?;
        if template.active_version == Some(version_number) {
            return self.get_version(template_id, version_number);
        }

        let version = self
            .storage
            .activate(template_id, version_number, template.active_version)?;
        tracing::info!(
            template_id = %template_id,
            from = ?template.active_version,
            to = version_number,
            "Activated version"
        );
        Ok(version)
    }

    /// Gets a version by number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template or version does not exist.
    pub fn get_version(&self, template_id: &TemplateId, version_number: u32) -> Result<Version> {
        if let Some(version) = self.storage.get_version(template_id, version_number)? {
            return Ok(version);
        }
        self.get_template(template_id)?;
        Err(Error::NotFound(format!(
            "version {version_number} of template '{template_id}'"
        )))
    }

    /// Gets a version by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no version has this identifier.
    pub fn get_version_by_id(&self, version_id: &VersionId) -> Result<Version> {
        self.storage
            .get_version_by_id(version_id)?
            .ok_or_else(|| Error::NotFound(format!("version '{version_id}'")))
    }

    /// Lists all versions of a template, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist.
    pub fn list_versions(&self, template_id: &TemplateId) -> Result<Vec<Version>> {
        let versions = self.storage.list_versions(template_id)?;
        if versions.is_empty() {
            self.get_template(template_id)?;
        }
        Ok(versions)
    }

    /// Gets the most recent version, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist.
    pub fn latest_version(&self, template_id: &TemplateId) -> Result<Option<Version>> {
        match self.storage.latest_version_number(template_id)? {
            Some(number) => self.get_version(template_id, number).map(Some),
            None => self.get_template(template_id).map(|_| None),
        }
    }

    /// Gets the active version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the template does not exist or has no
    /// active version.
    pub fn get_active_version(&self, template_id: &TemplateId) -> Result<Version> {
        let template = self.get_template(template_id)?;
        let number = template.active_version.ok_or_else(|| {
            Error::NotFound(format!("active version of template '{template_id}'"))
        })?;
        self.get_version(template_id, number)
    }

    /// Returns the components of a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    pub fn get_components(&self, version_id: &VersionId) -> Result<Vec<Component>> {
        self.storage.get_components(version_id)
    }

    /// Returns the parameters of a version.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    pub fn get_parameters(&self, version_id: &VersionId) -> Result<Vec<Parameter>> {
        self.storage.get_parameters(version_id)
    }
}
