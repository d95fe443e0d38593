//! Version and parameter models.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TemplateId;
use crate::{Error, Result};

/// Unique identifier of a stored version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Creates a version ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, time-ordered version ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An immutable snapshot of a template's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Unique identifier.
    pub id: VersionId,
    /// Owning template.
    pub template_id: TemplateId,
    /// 1-based, gapless, strictly increasing number within the template.
    pub version_number: u32,
    /// Full raw content.
    pub content: String,
    /// SHA-256 of `content` (hex).
    pub content_hash: String,
    /// Whether this is the template's active version.
    pub is_active: bool,
    /// Author of the version.
    pub created_by: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Optional note attached at creation.
    pub comment: Option<String>,
    /// Version this one was copied from by a hard rollback.
    pub source_version: Option<u32>,
}

impl Version {
    /// Returns a short label such as `demo@3`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}@{}", self.template_id, self.version_number)
    }
}

/// Type of a version parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// Free text.
    #[default]
    String,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Float,
    /// `true` / `false`.
    Boolean,
    /// Arbitrary JSON document.
    Json,
}

impl ParameterType {
    /// Returns the storage name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }

    /// Parses a type name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "text" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "float" | "number" => Some(Self::Float),
            "boolean" | "bool" => Some(Self::Boolean),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Infers the narrowest type that can represent `value`.
    #[must_use]
    pub fn infer(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.parse::<i64>().is_ok() {
            Self::Integer
        } else if trimmed.parse::<f64>().is_ok() {
            Self::Float
        } else if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
            Self::Boolean
        } else if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
        {
            Self::Json
        } else {
            Self::String
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed configuration knob versioned alongside content (e.g. temperature).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Value type.
    pub parameter_type: ParameterType,
    /// Key, unique within a version.
    pub key: String,
    /// Raw value.
    pub value: String,
}

impl Parameter {
    /// Creates a parameter with an explicit type.
    #[must_use]
    pub fn new(parameter_type: ParameterType, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter_type,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a parameter, inferring its type from the value.
    #[must_use]
    pub fn infer(key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            parameter_type: ParameterType::infer(&value),
            key: key.into(),
            value,
        }
    }

    /// Parses a `key=value` assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if there is no `=` or the key is empty.
    pub fn parse_assignment(assignment: &str) -> Result<Self> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!(
                "Parameter '{assignment}' must have the form key=value"
            ))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Parameter '{assignment}' has an empty key"
            )));
        }
        Ok(Self::infer(key, value.trim()))
    }
}

/// Collapses duplicate keys, keeping the last occurrence, sorted by key.
#[must_use]
pub fn normalize_parameters(parameters: &[Parameter]) -> Vec<Parameter> {
    let mut by_key = std::collections::BTreeMap::new();
    for parameter in parameters {
        by_key.insert(parameter.key.clone(), parameter.clone());
    }
    by_key.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("42", ParameterType::Integer ; "integer")]
    #[test_case("-7", ParameterType::Integer ; "negative integer")]
    #[test_case("0.7", ParameterType::Float ; "float")]
    #[test_case("TRUE", ParameterType::Boolean ; "boolean")]
    #[test_case("{\"a\": 1}", ParameterType::Json ; "json object")]
    #[test_case("[1, 2]", ParameterType::Json ; "json array")]
    #[test_case("{not json", ParameterType::String ; "broken json")]
    #[test_case("gpt-4o", ParameterType::String ; "string")]
    fn test_parameter_type_inference(value: &str, expected: ParameterType) {
        assert_eq!(ParameterType::infer(value), expected);
    }

    #[test]
    fn test_parameter_type_roundtrip() {
        for t in [
            ParameterType::String,
            ParameterType::Integer,
            ParameterType::Float,
            ParameterType::Boolean,
            ParameterType::Json,
        ] {
            assert_eq!(ParameterType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ParameterType::parse("unknown"), None);
    }

    #[test]
    fn test_parse_assignment() {
        let param = Parameter::parse_assignment("temperature = 0.2").unwrap();
        assert_eq!(param.key, "temperature");
        assert_eq!(param.value, "0.2");
        assert_eq!(param.parameter_type, ParameterType::Float);

        let param = Parameter::parse_assignment("stop=a=b").unwrap();
        assert_eq!(param.value, "a=b");

        assert!(Parameter::parse_assignment("no-equals").is_err());
        assert!(Parameter::parse_assignment("=1").is_err());
    }

    #[test]
    fn test_normalize_parameters_last_wins() {
        let params = vec![
            Parameter::infer("top_p", "0.9"),
            Parameter::infer("temperature", "0.1"),
            Parameter::infer("temperature", "0.5"),
        ];
        let normalized = normalize_parameters(&params);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].key, "temperature");
        assert_eq!(normalized[0].value, "0.5");
        assert_eq!(normalized[1].key, "top_p");
    }

    #[test]
    fn test_version_id_generate_is_unique() {
        let a = VersionId::generate();
        let b = VersionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
