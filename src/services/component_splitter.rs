//! Splits raw template content into structural components.
//!
//! # Format
//!
//! Blocks start with a marker line and run until the next marker:
//!
//! ```text
//! You analyse coding sessions.        <- preamble (unparsed)
//!
//! [[meta]]
//! Be concise.
//!
//! [[output_template:json]]
//! {"summary": "..."}
//! ```
//!
//! Markers take the form `[[type]]` or `[[type:name]]`. Recognized types are
//! `meta_prompt` (`meta`), `input_template` (`input`), `output_template`
//! (`output`), `system_prompt` (`system`) and `examples` (`few_shot`).
//!
//! Splitting never fails. Unknown markers drop their block, content without
//! any marker is kept as a single `unparsed` component, and both situations
//! are reported as [`SplitIssue`]s.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use super::ContentHasher;
use crate::Error;
use crate::models::{Component, ComponentKey, ComponentType};

/// Marker line: `[[type]]` or `[[type:name]]`.
static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\[\s*([A-Za-z][A-Za-z0-9_-]*)\s*(?::\s*([A-Za-z0-9][A-Za-z0-9_.-]*)\s*)?\]\]$")
        .unwrap_or_else(|_| unreachable!())
});

/// Name of the component holding text before the first marker.
pub const PREAMBLE_NAME: &str = "preamble";

/// Name of the component holding content that has no markers at all.
pub const CONTENT_NAME: &str = "content";

/// A recoverable problem found while splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitIssue {
    /// A marker named a type that is not recognized; its block was dropped.
    UnknownMarker {
        /// 1-based line of the marker.
        line: usize,
        /// The unrecognized tag.
        tag: String,
    },
    /// The content has no markers and was kept as a single unparsed component.
    Unstructured,
    /// No component at all could be produced.
    NoComponents,
}

impl SplitIssue {
    /// Converts the issue into a [`Error::Validation`] for logging or reporting.
    #[must_use]
    pub fn to_error(&self) -> Error {
        Error::Validation(self.to_string())
    }
}

impl fmt::Display for SplitIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMarker { line, tag } => {
                write!(f, "unknown block marker '[[{tag}]]' on line {line}, block dropped")
            },
            Self::Unstructured => f.write_str("no block markers found, content kept as unparsed"),
            Self::NoComponents => f.write_str("content yields no components"),
        }
    }
}

/// Result of splitting content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Components in document order.
    pub components: Vec<Component>,
    /// Problems encountered; empty for well-formed content.
    pub issues: Vec<SplitIssue>,
}

impl SplitOutcome {
    /// Returns true if any component came from a recognized marker.
    #[must_use]
    pub fn has_recognized_components(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.component_type != ComponentType::Unparsed)
    }
}

/// Section currently being collected.
enum Section {
    Preamble,
    Block(ComponentType, String),
    Dropped,
}

/// Parses template content into components.
pub struct ComponentSplitter;

impl ComponentSplitter {
    /// Splits `content` into components tagged with `language`.
    ///
    /// `modified_at` is stamped on every component as its `last_modified`.
    /// The result is deterministic: identical input yields identical output.
    #[must_use]
    pub fn split(content: &str, language: &str, modified_at: u64) -> SplitOutcome {
        let mut builder = OutcomeBuilder::new(language, modified_at);
        let mut section = Section::Preamble;
        let mut lines: Vec<&str> = Vec::new();
        let mut saw_marker = false;

        for (index, line) in content.lines().enumerate() {
            let Some(captures) = MARKER_PATTERN.captures(line.trim()) else {
                lines.push(line);
                continue;
            };

            builder.finish(&section, &lines);
            lines.clear();
            saw_marker = true;

            let tag = &captures[1];
            section = match ComponentType::from_marker(tag) {
                Some(component_type) => {
                    let name = captures
                        .get(2)
                        .map_or_else(|| component_type.as_str().to_string(), |m| m.as_str().to_lowercase());
                    Section::Block(component_type, name)
                },
                None => {
                    let issue = SplitIssue::UnknownMarker {
                        line: index + 1,
                        tag: tag.to_string(),
                    };
                    tracing::warn!(line = index + 1, tag, "Dropping block with unknown marker");
                    builder.issues.push(issue);
                    Section::Dropped
                },
            };
        }

        if saw_marker {
            builder.finish(&section, &lines);
        } else if !is_blank(&lines) {
            builder.push(ComponentType::Unparsed, CONTENT_NAME.to_string(), &lines);
            builder.issues.push(SplitIssue::Unstructured);
        }

        if builder.components.is_empty() {
            builder.issues.push(SplitIssue::NoComponents);
        }

        builder.build()
    }
}

struct OutcomeBuilder<'a> {
    language: &'a str,
    modified_at: u64,
    components: Vec<Component>,
    issues: Vec<SplitIssue>,
    seen: HashSet<ComponentKey>,
}

impl<'a> OutcomeBuilder<'a> {
    fn new(language: &'a str, modified_at: u64) -> Self {
        Self {
            language,
            modified_at,
            components: Vec::new(),
            issues: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn finish(&mut self, section: &Section, lines: &[&str]) {
        match section {
            Section::Preamble if !is_blank(lines) => {
                self.push(ComponentType::Unparsed, PREAMBLE_NAME.to_string(), lines);
            },
            Section::Block(component_type, name) => {
                self.push(*component_type, name.clone(), lines);
            },
            Section::Preamble | Section::Dropped => {},
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn push(&mut self, component_type: ComponentType, name: String, lines: &[&str]) {
        let name = self.unique_name(component_type, name);
        let end = lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(0, |i| i + 1);
        let content = lines[..end].join("\n");

        self.components.push(Component {
            component_type,
            ordinal: self.components.len() as u32,
            content_hash: ContentHasher::hash(&content),
            content,
            name,
            language: self.language.to_string(),
            last_modified: self.modified_at,
        });
    }

    /// Suffixes `-2`, `-3`, ... onto repeated keys.
    fn unique_name(&mut self, component_type: ComponentType, name: String) -> String {
        let mut candidate = name.clone();
        let mut counter = 1;
        while self.seen.contains(&ComponentKey {
            component_type,
            name: candidate.clone(),
        }) {
            counter += 1;
            candidate = format!("{name}-{counter}");
        }
        self.seen.insert(ComponentKey {
            component_type,
            name: candidate.clone(),
        });
        candidate
    }

    fn build(self) -> SplitOutcome {
        tracing::debug!(
            components = self.components.len(),
            issues = self.issues.len(),
            "Split template content"
        );
        SplitOutcome {
            components: self.components,
            issues: self.issues,
        }
    }
}

fn is_blank(lines: &[&str]) -> bool {
    lines.iter().all(|line| line.trim().is_empty())
}
