//! Data models for promptvc.
//!
//! This module contains all the core data structures used throughout the system.

mod change;
mod component;
mod diff;
mod template;
mod version;

pub use change::{ACTIVE_VERSION_FIELD, Change, NewChange};
pub use component::{Component, ComponentKey, ComponentType};
pub use diff::{
    ChangeType, ComponentDiff, DiffSummary, LineChangeType, LineDiff, ParameterDiff, VersionDiff,
};
pub use template::{DEFAULT_LANGUAGE, MAX_TEMPLATE_ID_LENGTH, NewTemplate, Template, TemplateId};
pub use version::{Parameter, ParameterType, Version, VersionId, normalize_parameters};
