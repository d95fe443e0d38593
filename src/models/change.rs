//! Change log records.

use serde::{Deserialize, Serialize};

use super::{ChangeType, TemplateId};

/// Field name used for rollback entries.
pub const ACTIVE_VERSION_FIELD: &str = "active_version";

/// A persisted, field-level difference observed between two versions.
///
/// Changes are derived from diffs and only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Monotonic row identifier.
    pub id: i64,
    /// Template the change belongs to.
    pub template_id: TemplateId,
    /// Source version; `None` when there was no predecessor.
    pub from_version: Option<u32>,
    /// Target version.
    pub to_version: u32,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Changed field, e.g. `component.meta_prompt.meta_prompt` or `parameter.temperature`.
    pub field_name: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
    /// Human-readable summary.
    pub change_summary: Option<String>,
    /// Timestamp the change was recorded (Unix epoch seconds).
    pub changed_at: u64,
}

impl Change {
    /// Returns true if this entry documents a hard rollback.
    #[must_use]
    pub fn is_rollback(&self) -> bool {
        self.field_name == ACTIVE_VERSION_FIELD
    }
}

/// A change about to be appended to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChange {
    /// Template the change belongs to.
    pub template_id: TemplateId,
    /// Source version.
    pub from_version: Option<u32>,
    /// Target version.
    pub to_version: u32,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Changed field.
    pub field_name: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change.
    pub new_value: Option<String>,
    /// Human-readable summary.
    pub change_summary: Option<String>,
}
