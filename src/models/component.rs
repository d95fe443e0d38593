//! Structural components of a version's content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a content block.
///
/// `Unparsed` keeps the splitter total: content that does not sit under a
/// recognized block marker is still represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// Instruction block steering the model.
    MetaPrompt,
    /// Template for the user/input turn.
    InputTemplate,
    /// Expected output format.
    OutputTemplate,
    /// System prompt.
    SystemPrompt,
    /// Few-shot examples.
    Examples,
    /// Content outside any recognized block.
    Unparsed,
}

impl ComponentType {
    /// Returns all component types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::MetaPrompt,
            Self::InputTemplate,
            Self::OutputTemplate,
            Self::SystemPrompt,
            Self::Examples,
            Self::Unparsed,
        ]
    }

    /// Returns the canonical marker/storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MetaPrompt => "meta_prompt",
            Self::InputTemplate => "input_template",
            Self::OutputTemplate => "output_template",
            Self::SystemPrompt => "system_prompt",
            Self::Examples => "examples",
            Self::Unparsed => "unparsed",
        }
    }

    /// Parses a block marker tag, accepting short aliases.
    ///
    /// `unparsed` is not accepted: it is reserved for content the splitter
    /// could not attribute to a block.
    #[must_use]
    pub fn from_marker(tag: &str) -> Option<Self> {
        match tag.to_lowercase().replace('-', "_").as_str() {
            "meta_prompt" | "meta" => Some(Self::MetaPrompt),
            "input_template" | "input" => Some(Self::InputTemplate),
            "output_template" | "output" => Some(Self::OutputTemplate),
            "system_prompt" | "system" => Some(Self::SystemPrompt),
            "examples" | "few_shot" => Some(Self::Examples),
            _ => None,
        }
    }

    /// Parses a stored type name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s == Self::Unparsed.as_str() {
            return Some(Self::Unparsed);
        }
        Self::from_marker(s)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matching key of a component across versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    /// Component type.
    pub component_type: ComponentType,
    /// Component name.
    pub name: String,
}

impl ComponentKey {
    /// Returns the change-log field name, e.g. `component.meta_prompt.meta_prompt`.
    #[must_use]
    pub fn field_name(&self) -> String {
        format!("component.{}.{}", self.component_type, self.name)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.component_type.as_str() {
            write!(f, "{}", self.component_type)
        } else {
            write!(f, "{}:{}", self.component_type, self.name)
        }
    }
}

/// A named, typed slice of a version's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Block type.
    pub component_type: ComponentType,
    /// Block name, unique per type within a version.
    pub name: String,
    /// Position within the version (0-based).
    pub ordinal: u32,
    /// Block content.
    pub content: String,
    /// SHA-256 of `content` (hex).
    pub content_hash: String,
    /// Language tag.
    pub language: String,
    /// Timestamp of the version that introduced this content (Unix epoch seconds).
    pub last_modified: u64,
}

impl Component {
    /// Returns the matching key.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            component_type: self.component_type,
            name: self.name.clone(),
        }
    }
}
