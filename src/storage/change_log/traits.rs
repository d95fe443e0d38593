//! Change log storage trait definition.

use crate::Result;
use crate::models::{Change, NewChange, TemplateId};

/// Trait for change log storage backends.
///
/// The log is append-only: rows are never updated, and only removed when the
/// owning template is deleted.
pub trait ChangeLogStorage: Send + Sync {
    /// Appends changes atomically and returns them with ids and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist.
    fn append(&self, changes: &[NewChange]) -> Result<Vec<Change>>;

    /// Returns all changes recorded with `to_version` as the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn changes_to(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>>;

    /// Returns all changes with a target version up to and including
    /// `to_version`, ordered by (version, id).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn changes_through(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>>;

    /// Returns the distinct target versions that have recorded changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be accessed.
    fn recorded_versions(&self, template_id: &TemplateId) -> Result<Vec<u32>>;
}
