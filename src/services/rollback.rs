//! Soft and hard rollback.
//!
//! - **Soft** ([`RollbackController::activate`]): repoint the active version.
//!   No version is created and the operation can be undone by activating the
//!   previous version again.
//! - **Hard** ([`RollbackController::rollback_hard`]): copy an old version's
//!   content and parameters into a new version and activate it. History is
//!   never rewritten.
//!
//! Only one activation or rollback per template may be in flight at a time. A
//! second request for the same template fails with [`Error::Conflict`] instead
//! of waiting; activation itself is a compare-and-swap, so writers in other
//! processes are caught by storage as well.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::instrument;

use super::{ChangeTracker, VersionDraft, VersionStore};
use crate::models::{TemplateId, Version};
use crate::storage::ActivationPolicy;
use crate::storage::sqlite::acquire_lock;
use crate::{Error, Result};

/// Rollback strategy, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStrategy {
    /// Repoint the active version.
    Soft,
    /// Materialize a new version from an old one.
    Hard,
}

impl RollbackStrategy {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// Executes activations and rollbacks, one per template at a time.
pub struct RollbackController {
    versions: Arc<VersionStore>,
    tracker: Arc<ChangeTracker>,
    in_flight: Mutex<HashSet<TemplateId>>,
}

/// Releases a template's in-flight slot on drop.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<TemplateId>>,
    template_id: TemplateId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        acquire_lock(self.in_flight).remove(&self.template_id);
    }
}

impl RollbackController {
    /// Creates a rollback controller.
    #[must_use]
    pub fn new(versions: Arc<VersionStore>, tracker: Arc<ChangeTracker>) -> Self {
        Self {
            versions,
            tracker,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn begin(&self, template_id: &TemplateId) -> Result<InFlightGuard<'_>> {
        if !acquire_lock(&self.in_flight).insert(template_id.clone()) {
            metrics::counter!("rollback_conflicts_total").increment(1);
            return Err(Error::Conflict(format!(
                "another activation or rollback of template '{template_id}' is in progress"
            )));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            template_id: template_id.clone(),
        })
    }

    /// Soft rollback: makes `target_version` the active version.
    ///
    /// Re-activating the currently active version is accepted and changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown template or version, or
    /// [`Error::Conflict`] if another activation or rollback for the template
    /// is in flight.
    #[instrument(skip(self, template_id), fields(template_id = %template_id, strategy = "soft"))]
    pub fn activate(&self, template_id: &TemplateId, target_version: u32) -> Result<Version> {
        let start = Instant::now();
        let _guard = self.begin(template_id)?;

        let result = self.versions.activate_version(template_id, target_version);
        record_rollback_metrics(RollbackStrategy::Soft, start, result.is_ok());
        result
    }

    /// Hard rollback: creates a new version copying `target_version` and
    /// activates it.
    ///
    /// The change log receives an `active_version` entry summarized by
    /// `comment` (or `Rollback to version k`), plus the content changes from the
    /// previously active version. Once the new version is committed the call
    /// succeeds even if the change log cannot be written; the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown template or version, or
    /// [`Error::Conflict`] if another activation or rollback for the template
    /// is in flight.
    #[instrument(skip(self, template_id, comment), fields(template_id = %template_id, strategy = "hard"))]
    pub fn rollback_hard(
        &self,
        template_id: &TemplateId,
        target_version: u32,
        comment: Option<&str>,
        created_by: &str,
    ) -> Result<Version> {
        let start = Instant::now();
        let _guard = self.begin(template_id)?;

        let result = self.execute_hard(template_id, target_version, comment, created_by);
        record_rollback_metrics(RollbackStrategy::Hard, start, result.is_ok());
        result
    }

    fn execute_hard(
        &self,
        template_id: &TemplateId,
        target_version: u32,
        comment: Option<&str>,
        created_by: &str,
    ) -> Result<Version> {
        let template = self.versions.get_template(template_id)?;
        let target = self.versions.get_version(template_id, target_version)?;
        let previous_active = template
            .active_version
            .map(|number| self.versions.get_version(template_id, number))
            .transpose()?;

        let mut draft = VersionDraft::new(target.content.clone(), created_by)
            .with_parameters(self.versions.get_parameters(&target.id)?);
        draft.comment = comment.map(str::to_string);

        let created = self.versions.insert(
            template_id,
            draft,
            Some(target_version),
            ActivationPolicy::Replace {
                expected: template.active_version,
            },
        )?;

        // The new version is committed and active at this point; a missing log
        // entry is rebuilt by `ChangeTracker::regenerate`.
        if let Err(e) =
            self.tracker
                .record_rollback(previous_active.as_ref(), &created, target_version, comment)
        {
            tracing::warn!(
                template_id = %template_id,
                version = created.version_number,
                error = %e,
                "Failed to record changes for hard rollback"
            );
        }

        tracing::info!(
            template_id = %template_id,
            target = target_version,
            created = created.version_number,
            previous = ?template.active_version,
            "Hard rollback completed"
        );
        Ok(created)
    }
}

fn record_rollback_metrics(strategy: RollbackStrategy, start: Instant, success: bool) {
    let status = if success { "success" } else { "error" };
    metrics::counter!(
        "rollbacks_total",
        "strategy" => strategy.as_str(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("rollback_duration_ms", "strategy" => strategy.as_str())
        .record(start.elapsed().as_secs_f64() * 1000.0);
}
