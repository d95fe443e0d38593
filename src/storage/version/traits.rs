//! Version storage trait definition.

use crate::Result;
use crate::models::{
    Component, NewTemplate, Parameter, Template, TemplateId, Version, VersionId,
};

/// How a write affects the template's active-version pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    /// Activate only if the template has no active version yet.
    ///
    /// Used for regular version creation: the first version becomes active,
    /// later ones leave the pointer alone.
    IfNone,
    /// Activate unconditionally, provided the pointer still holds `expected`.
    ///
    /// The swap fails with [`crate::Error::Conflict`] when another writer moved
    /// the pointer after the caller read it.
    Replace {
        /// The active version number the caller observed.
        expected: Option<u32>,
    },
}

/// A version about to be persisted.
///
/// The version number is not part of the request: it is allocated by the
/// backend inside the write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    /// Pre-generated identifier.
    pub id: VersionId,
    /// Owning template.
    pub template_id: TemplateId,
    /// Full raw content.
    pub content: String,
    /// SHA-256 of `content` (hex).
    pub content_hash: String,
    /// Author.
    pub created_by: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Optional note.
    pub comment: Option<String>,
    /// Version copied by a hard rollback.
    pub source_version: Option<u32>,
    /// Components parsed from `content`.
    pub components: Vec<Component>,
    /// Normalized parameters.
    pub parameters: Vec<Parameter>,
}

/// Trait for version storage backends.
///
/// Implementations must make [`VersionStorage::insert_version`] and
/// [`VersionStorage::activate`] atomic: version numbers are allocated without
/// gaps or repeats, and readers never observe zero or two active versions for
/// a template that has versions.
pub trait VersionStorage: Send + Sync {
    /// Creates a template.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if the template already exists.
    fn create_template(&self, template: &NewTemplate) -> Result<Template>;

    /// Gets a template by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn get_template(&self, id: &TemplateId) -> Result<Option<Template>>;

    /// Lists all templates ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn list_templates(&self) -> Result<Vec<Template>>;

    /// Deletes a template with its versions, components, parameters and changes.
    ///
    /// # Returns
    ///
    /// True if the template existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn delete_template(&self, id: &TemplateId) -> Result<bool>;

    /// Persists a version with its components and parameters.
    ///
    /// Allocates the next version number (`max + 1`, or 1 for an empty
    /// template) and applies `activation` in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist, or
    /// [`crate::Error::Conflict`] if the activation swap lost a race.
    fn insert_version(&self, version: &NewVersion, activation: ActivationPolicy)
    -> Result<Version>;

    /// Gets a version by template and number.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn get_version(&self, template_id: &TemplateId, version_number: u32)
    -> Result<Option<Version>>;

    /// Gets a version by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn get_version_by_id(&self, id: &VersionId) -> Result<Option<Version>>;

    /// Lists all versions of a template in ascending number order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn list_versions(&self, template_id: &TemplateId) -> Result<Vec<Version>>;

    /// Returns the highest version number of a template, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn latest_version_number(&self, template_id: &TemplateId) -> Result<Option<u32>>;

    /// Points the template's active version at `version_number`.
    ///
    /// The swap only happens if the pointer still equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or version does not
    /// exist, or [`crate::Error::Conflict`] if the pointer moved.
    fn activate(
        &self,
        template_id: &TemplateId,
        version_number: u32,
        expected: Option<u32>,
    ) -> Result<Version>;

    /// Returns the components of a version in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn get_components(&self, version_id: &VersionId) -> Result<Vec<Component>>;

    /// Returns the parameters of a version ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn get_parameters(&self, version_id: &VersionId) -> Result<Vec<Parameter>>;
}
