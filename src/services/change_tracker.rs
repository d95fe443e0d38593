//! Change tracking.
//!
//! Flattens [`VersionDiff`]s into field-level [`Change`] rows and appends them
//! to the change log. The log is derived data: it can be rebuilt from stored
//! versions with [`ChangeTracker::regenerate`].

use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::{DiffEngine, VersionStore};
use crate::models::{
    ACTIVE_VERSION_FIELD, Change, ChangeType, NewChange, TemplateId, Version, VersionDiff,
};
use crate::storage::ChangeLogStorage;
use crate::Result;

/// Records and queries the change log.
pub struct ChangeTracker {
    log: Arc<dyn ChangeLogStorage>,
    versions: Arc<VersionStore>,
    diff: Arc<DiffEngine>,
}

impl ChangeTracker {
    /// Creates a change tracker.
    #[must_use]
    pub fn new(
        log: Arc<dyn ChangeLogStorage>,
        versions: Arc<VersionStore>,
        diff: Arc<DiffEngine>,
    ) -> Self {
        Self { log, versions, diff }
    }

    /// Diffs `from` against `to` and appends the resulting changes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or either version
    /// does not exist.
    #[instrument(skip(self, template_id), fields(template_id = %template_id))]
    pub fn record_changes(
        &self,
        template_id: &TemplateId,
        from_version: u32,
        to_version: u32,
    ) -> Result<Vec<Change>> {
        let diff = self.diff.compare(template_id, from_version, to_version)?;
        let changes = self.log.append(&changes_from_diff(&diff))?;
        tracing::debug!(
            from = from_version,
            to = to_version,
            count = changes.len(),
            "Recorded changes"
        );
        Ok(changes)
    }

    /// Returns every change recorded with `to_version` as the target.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or version does not exist.
    pub fn get_changes(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>> {
        self.versions.get_version(template_id, to_version)?;
        self.log.changes_to(template_id, to_version)
    }

    /// Returns the recorded log for all versions up to and including
    /// `to_version`, ordered by version then insertion.
    ///
    /// This is a concatenation of recorded rows, not a cumulative diff; use
    /// [`DiffEngine::compare`] from version 1 for the latter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template or version does not exist.
    pub fn history(&self, template_id: &TemplateId, to_version: u32) -> Result<Vec<Change>> {
        self.versions.get_version(template_id, to_version)?;
        self.log.changes_through(template_id, to_version)
    }

    /// Records a hard rollback.
    ///
    /// Appends one `active_version` change plus the content changes from the
    /// previously active version to the new one, in a single write.
    ///
    /// # Errors
    ///
    /// Returns an error if the diff cannot be computed or the log cannot be written.
    pub fn record_rollback(
        &self,
        previous_active: Option<&Version>,
        rolled_back: &Version,
        target_version: u32,
        comment: Option<&str>,
    ) -> Result<Vec<Change>> {
        let mut changes = vec![activation_change(
            previous_active.map(|v| v.version_number),
            rolled_back,
            target_version,
            comment,
        )];

        if let Some(previous) = previous_active {
            let diff = self.diff.diff_versions(previous, rolled_back)?;
            changes.extend(changes_from_diff(&diff));
        }

        self.log.append(&changes)
    }

    /// Re-records changes for every version that has none, diffing each
    /// version against its predecessor. Version 1 is skipped.
    ///
    /// A version copied by a hard rollback also gets its `active_version`
    /// entry back. The previously active number is not stored anywhere, so
    /// that entry has no old value.
    ///
    /// Running it twice records nothing the second time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the template does not exist.
    #[instrument(skip(self, template_id), fields(template_id = %template_id))]
    pub fn regenerate(&self, template_id: &TemplateId) -> Result<Vec<Change>> {
        let versions = self.versions.list_versions(template_id)?;
        let recorded: HashSet<u32> = self.log.recorded_versions(template_id)?.into_iter().collect();

        let mut pending = Vec::new();
        for pair in versions.windows(2) {
            let [previous, current] = pair else {
                continue;
            };
            if recorded.contains(&current.version_number) {
                continue;
            }
            if let Some(source) = current.source_version {
                pending.push(activation_change(None, current, source, current.comment.as_deref()));
            }
            let diff = self.diff.diff_versions(previous, current)?;
            pending.extend(changes_from_diff(&diff));
        }

        let changes = self.log.append(&pending)?;
        tracing::info!(template_id = %template_id, count = changes.len(), "Regenerated change log");
        Ok(changes)
    }
}

/// The `active_version` entry written for a hard rollback.
fn activation_change(
    previous_active: Option<u32>,
    rolled_back: &Version,
    target_version: u32,
    comment: Option<&str>,
) -> NewChange {
    let summary = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map_or_else(|| format!("Rollback to version {target_version}"), str::to_string);

    NewChange {
        template_id: rolled_back.template_id.clone(),
        from_version: previous_active,
        to_version: rolled_back.version_number,
        change_type: ChangeType::Updated,
        field_name: ACTIVE_VERSION_FIELD.to_string(),
        old_value: previous_active.map(|n| n.to_string()),
        new_value: Some(rolled_back.version_number.to_string()),
        change_summary: Some(summary),
    }
}

/// Flattens a diff into change rows: one per component, one per parameter.
#[must_use]
pub fn changes_from_diff(diff: &VersionDiff) -> Vec<NewChange> {
    let from_version = Some(diff.from_version);

    let components = diff.components.iter().map(|component| NewChange {
        template_id: diff.template_id.clone(),
        from_version,
        to_version: diff.to_version,
        change_type: component.change_type,
        field_name: component.key().field_name(),
        old_value: component.old_content.clone(),
        new_value: component.new_content.clone(),
        change_summary: Some(component.summary().to_string()),
    });

    let parameters = diff.parameters.iter().map(|parameter| {
        let summary = match (&parameter.old_value, &parameter.new_value) {
            (Some(old), Some(new)) => format!("{old} -> {new}"),
            (None, Some(new)) => format!("set to {new}"),
            (Some(old), None) => format!("removed (was {old})"),
            (None, None) => String::new(),
        };
        NewChange {
            template_id: diff.template_id.clone(),
            from_version,
            to_version: diff.to_version,
            change_type: parameter.change_type,
            field_name: format!("parameter.{}", parameter.key),
            old_value: parameter.old_value.clone(),
            new_value: parameter.new_value.clone(),
            change_summary: Some(summary),
        }
    });

    components.chain(parameters).collect()
}
