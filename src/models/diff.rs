//! Diff results between two versions.
//!
//! These types are ephemeral: they are computed on demand and never persisted.
//! The change log stores a flattened projection of them (see [`super::Change`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ComponentKey, ComponentType, TemplateId};

/// Kind of a field-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Present only on the "to" side.
    Created,
    /// Present on both sides with different values.
    Updated,
    /// Present only on the "from" side.
    Deleted,
}

impl ChangeType {
    /// Returns the storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Parses a storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Returns the change type seen when comparing in the opposite direction.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Created => Self::Deleted,
            Self::Updated => Self::Updated,
            Self::Deleted => Self::Created,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a line-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineChangeType {
    /// Line only exists in the target.
    Added,
    /// Line only exists in the source.
    Removed,
    /// Line exists at the same relative position in both with different text.
    Modified,
}

impl LineChangeType {
    /// Returns the marker used in textual diff output.
    #[must_use]
    pub const fn sigil(&self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Modified => '~',
        }
    }

    /// Returns the line change seen when comparing in the opposite direction.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Added => Self::Removed,
            Self::Removed => Self::Added,
            Self::Modified => Self::Modified,
        }
    }
}

/// One changed line inside a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    /// Kind of change.
    pub change_type: LineChangeType,
    /// 1-based line number in the target; `None` for removed lines.
    pub line_number: Option<usize>,
    /// 1-based line number in the source; `None` for added lines.
    pub old_line_number: Option<usize>,
    /// Source text, if the line existed in the source.
    pub old_text: Option<String>,
    /// Target text, if the line exists in the target.
    pub new_text: Option<String>,
}

impl LineDiff {
    /// Returns the same line seen from the other side.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            change_type: self.change_type.inverse(),
            line_number: self.old_line_number,
            old_line_number: self.line_number,
            old_text: self.new_text.clone(),
            new_text: self.old_text.clone(),
        }
    }
}

/// Difference of one component between two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDiff {
    /// Component type.
    pub component_type: ComponentType,
    /// Component name.
    pub name: String,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Content in the source version.
    pub old_content: Option<String>,
    /// Content in the target version.
    pub new_content: Option<String>,
    /// Changed lines in document order.
    pub lines: Vec<LineDiff>,
}

impl ComponentDiff {
    /// Returns the matching key.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            component_type: self.component_type,
            name: self.name.clone(),
        }
    }

    /// Counts changed lines by kind.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for line in &self.lines {
            summary.record(line.change_type);
        }
        summary
    }

    /// Returns the diff from the target back to the source.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            component_type: self.component_type,
            name: self.name.clone(),
            change_type: self.change_type.inverse(),
            old_content: self.new_content.clone(),
            new_content: self.old_content.clone(),
            lines: self.lines.iter().map(LineDiff::inverted).collect(),
        }
    }
}

/// Difference of one parameter between two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDiff {
    /// Parameter key.
    pub key: String,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Value in the source version.
    pub old_value: Option<String>,
    /// Value in the target version.
    pub new_value: Option<String>,
}

impl ParameterDiff {
    /// Returns the diff from the target back to the source.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            key: self.key.clone(),
            change_type: self.change_type.inverse(),
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
        }
    }
}

/// Line counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Added lines.
    pub added: usize,
    /// Removed lines.
    pub removed: usize,
    /// Modified lines.
    pub modified: usize,
}

impl DiffSummary {
    const fn record(&mut self, change: LineChangeType) {
        match change {
            LineChangeType::Added => self.added += 1,
            LineChangeType::Removed => self.removed += 1,
            LineChangeType::Modified => self.modified += 1,
        }
    }

    /// Total number of changed lines.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} -{} ~{} lines",
            self.added, self.removed, self.modified
        )
    }
}

/// Result of comparing two versions of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
    /// Template compared.
    pub template_id: TemplateId,
    /// Source version number.
    pub from_version: u32,
    /// Target version number.
    pub to_version: u32,
    /// Changed components, ordered by key.
    pub components: Vec<ComponentDiff>,
    /// Changed parameters, ordered by key.
    pub parameters: Vec<ParameterDiff>,
}

impl VersionDiff {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.parameters.is_empty()
    }

    /// Aggregated line counts over all components.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut total = DiffSummary::default();
        for component in &self.components {
            for line in &component.lines {
                total.record(line.change_type);
            }
        }
        total
    }

    /// Returns the diff from `to_version` back to `from_version`.
    ///
    /// Keys, line pairings and ordering are preserved; only the direction flips.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            template_id: self.template_id.clone(),
            from_version: self.to_version,
            to_version: self.from_version,
            components: self.components.iter().map(ComponentDiff::inverted).collect(),
            parameters: self.parameters.iter().map(ParameterDiff::inverted).collect(),
        }
    }
}
