//! Prompt template models.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Maximum length of a template identifier.
pub const MAX_TEMPLATE_ID_LENGTH: usize = 64;

/// Default language tag applied to components.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Human identifier of a template (e.g. `session_analysis`).
///
/// Identifiers start with a lowercase ASCII letter and contain only lowercase
/// letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    /// Creates a validated template identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the identifier is empty, too long,
    /// or contains characters outside `[a-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_template_id(&id)?;
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps an identifier read back from storage without re-validating it.
    pub(crate) const fn from_trusted(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for TemplateId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

/// Validates a template identifier.
fn validate_template_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidInput(
            "Template id cannot be empty. Use a name like 'session_analysis' or 'code-review'."
                .to_string(),
        ));
    }

    if id.len() > MAX_TEMPLATE_ID_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Template id is {} characters, maximum is {MAX_TEMPLATE_ID_LENGTH}.",
            id.len()
        )));
    }

    let first_char = id.chars().next().unwrap_or('_');
    if !first_char.is_ascii_lowercase() {
        return Err(Error::InvalidInput(format!(
            "Template id must start with a lowercase letter, got '{id}'."
        )));
    }

    if let Some(ch) = id
        .chars()
        .find(|ch| !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && *ch != '-' && *ch != '_')
    {
        return Err(Error::InvalidInput(format!(
            "Invalid character '{ch}' in template id '{id}'. \
             Use lowercase letters, digits, '-' and '_' only."
        )));
    }

    if id.ends_with('-') || id.ends_with('_') {
        return Err(Error::InvalidInput(format!(
            "Template id cannot end with a separator: '{id}'."
        )));
    }

    Ok(())
}

/// A named, versioned prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Human identifier.
    pub id: TemplateId,
    /// Free-form description.
    pub description: String,
    /// Whether the template ships with the system (vs. user-defined).
    pub is_system: bool,
    /// Language tag applied to parsed components.
    pub language: String,
    /// Number of the active version, if any version exists.
    pub active_version: Option<u32>,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Last update timestamp (Unix epoch seconds).
    pub updated_at: u64,
}

/// Request to create a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplate {
    /// Human identifier.
    pub id: TemplateId,
    /// Free-form description.
    pub description: String,
    /// Whether the template ships with the system.
    pub is_system: bool,
    /// Language tag for components.
    pub language: String,
}

impl NewTemplate {
    /// Creates a user-defined template request with default language.
    #[must_use]
    pub fn new(id: TemplateId) -> Self {
        Self {
            id,
            description: String::new(),
            is_system: false,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the template as system-defined.
    #[must_use]
    pub const fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Sets the component language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("demo" ; "simple")]
    #[test_case("session_analysis" ; "snake case")]
    #[test_case("code-review-v2" ; "kebab case with digits")]
    fn test_valid_template_ids(id: &str) {
        assert_eq!(TemplateId::new(id).unwrap().as_str(), id);
    }

    #[test_case("" ; "empty")]
    #[test_case("Demo" ; "uppercase start")]
    #[test_case("1demo" ; "digit start")]
    #[test_case("demo prompt" ; "space")]
    #[test_case("demo-" ; "trailing hyphen")]
    #[test_case("demo_" ; "trailing underscore")]
    fn test_invalid_template_ids(id: &str) {
        assert!(matches!(TemplateId::new(id), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_template_id_too_long() {
        let id = "a".repeat(MAX_TEMPLATE_ID_LENGTH + 1);
        assert!(TemplateId::new(id).is_err());
        let id = "a".repeat(MAX_TEMPLATE_ID_LENGTH);
        assert!(TemplateId::new(id).is_ok());
    }

    #[test]
    fn test_new_template_builder() {
        let request = NewTemplate::new(TemplateId::new("demo").unwrap())
            .with_description("Demo prompt")
            .with_language("ja")
            .system();
        assert_eq!(request.description, "Demo prompt");
        assert_eq!(request.language, "ja");
        assert!(request.is_system);
    }

    #[test]
    fn test_template_id_serializes_transparently() {
        let id = TemplateId::new("demo").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"demo\"");
    }
}
