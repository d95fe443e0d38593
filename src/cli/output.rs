//! Output formatting for CLI commands.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Change, Component, Parameter, Template, Version, VersionDiff};
use crate::services::ContentHasher;
use crate::storage::sqlite::DatabaseStats;
use crate::{Error, Result};

/// Output format for commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables (default).
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl OutputFormat {
    /// Parses output format from string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown format.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(Error::InvalidInput(format!(
                "unknown output format '{other}', expected table, json or yaml"
            ))),
        }
    }
}

/// Serializes `value` as JSON or YAML.
///
/// Returns `None` for [`OutputFormat::Table`], which callers render themselves.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if serialization fails.
pub fn serialize<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Table => Ok(None),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("failed to render JSON: {e}"))),
        OutputFormat::Yaml => serde_yaml_ng::to_string(value)
            .map(|s| Some(s.trim_end().to_string()))
            .map_err(|e| Error::InvalidInput(format!("failed to render YAML: {e}"))),
    }
}

/// Renders a Unix timestamp as `YYYY-MM-DD HH:MM:SS` UTC.
#[must_use]
pub fn format_timestamp(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn truncate(s: &str, max: usize) -> String {
    let first_line = s.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max && first_line.len() == s.trim_end().len() {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// Renders a template table.
#[must_use]
pub fn templates_table(templates: &[Template]) -> String {
    if templates.is_empty() {
        return "No templates found.".to_string();
    }
    let mut out = format!(
        "{:<24} {:<7} {:<5} {:<7} {:<20} DESCRIPTION\n",
        "ID", "ACTIVE", "LANG", "SYSTEM", "UPDATED"
    );
    out.push_str(&"-".repeat(90));
    out.push('\n');
    for t in templates {
        let active = t.active_version.map_or_else(|| "-".to_string(), |v| v.to_string());
        let _ = writeln!(
            out,
            "{:<24} {:<7} {:<5} {:<7} {:<20} {}",
            t.id,
            active,
            t.language,
            if t.is_system { "yes" } else { "no" },
            format_timestamp(t.updated_at),
            truncate(&t.description, 40)
        );
    }
    let _ = write!(out, "\nTotal: {} templates", templates.len());
    out
}

/// Renders a single template.
#[must_use]
pub fn template_details(template: &Template) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Template: {}", template.id);
    if !template.description.is_empty() {
        let _ = writeln!(out, "Description: {}", template.description);
    }
    let _ = writeln!(out, "Language: {}", template.language);
    let _ = writeln!(out, "System: {}", if template.is_system { "yes" } else { "no" });
    let _ = writeln!(
        out,
        "Active version: {}",
        template
            .active_version
            .map_or_else(|| "none".to_string(), |v| v.to_string())
    );
    let _ = writeln!(out, "Created: {}", format_timestamp(template.created_at));
    let _ = write!(out, "Updated: {}", format_timestamp(template.updated_at));
    out
}

/// Renders a version table. The active version is marked with `*`.
#[must_use]
pub fn versions_table(versions: &[Version]) -> String {
    if versions.is_empty() {
        return "No versions found.".to_string();
    }
    let mut out = format!(
        "  {:<8} {:<13} {:<16} {:<20} {:<7} COMMENT\n",
        "VERSION", "HASH", "AUTHOR", "CREATED", "SOURCE"
    );
    out.push_str(&"-".repeat(90));
    out.push('\n');
    for v in versions {
        let source = v.source_version.map_or_else(|| "-".to_string(), |s| s.to_string());
        let _ = writeln!(
            out,
            "{} {:<8} {:<13} {:<16} {:<20} {:<7} {}",
            if v.is_active { "*" } else { " " },
            v.version_number,
            ContentHasher::short(&v.content_hash),
            truncate(&v.created_by, 16),
            format_timestamp(v.created_at),
            source,
            v.comment.as_deref().map(|c| truncate(c, 30)).unwrap_or_default()
        );
    }
    let _ = write!(out, "\nTotal: {} versions", versions.len());
    out
}

/// Renders a single version with its content.
#[must_use]
pub fn version_details(version: &Version) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Version: {}", version.label());
    let _ = writeln!(out, "Active: {}", if version.is_active { "yes" } else { "no" });
    let _ = writeln!(out, "Author: {}", version.created_by);
    let _ = writeln!(out, "Created: {}", format_timestamp(version.created_at));
    let _ = writeln!(out, "Hash: {}", version.content_hash);
    if let Some(source) = version.source_version {
        let _ = writeln!(out, "Rolled back from: {source}");
    }
    if let Some(comment) = &version.comment {
        let _ = writeln!(out, "Comment: {comment}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Content:");
    let _ = writeln!(out, "--------");
    out.push_str(&version.content);
    out
}

/// Renders a component table.
#[must_use]
pub fn components_table(components: &[Component]) -> String {
    if components.is_empty() {
        return "No components.".to_string();
    }
    let mut out = format!(
        "{:<4} {:<16} {:<20} {:<6} HASH\n",
        "ORD", "TYPE", "NAME", "LINES"
    );
    out.push_str(&"-".repeat(64));
    out.push('\n');
    for c in components {
        let _ = writeln!(
            out,
            "{:<4} {:<16} {:<20} {:<6} {}",
            c.ordinal,
            c.component_type.as_str(),
            c.name,
            c.content.lines().count(),
            ContentHasher::short(&c.content_hash)
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Renders a parameter table.
#[must_use]
pub fn parameters_table(parameters: &[Parameter]) -> String {
    if parameters.is_empty() {
        return "No parameters.".to_string();
    }
    let mut out = format!("{:<24} {:<8} VALUE\n", "KEY", "TYPE");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for p in parameters {
        let _ = writeln!(
            out,
            "{:<24} {:<8} {}",
            p.key,
            p.parameter_type.as_str(),
            truncate(&p.value, 40)
        );
    }
    out.truncate(out.trim_end().len());
    out
}

/// Renders a diff in a line-oriented text form.
#[must_use]
pub fn diff_text(diff: &VersionDiff) -> String {
    let mut out = format!(
        "{}: version {} -> {}\n",
        diff.template_id, diff.from_version, diff.to_version
    );
    if diff.is_empty() {
        out.push_str("No differences.");
        return out;
    }

    for component in &diff.components {
        let _ = writeln!(
            out,
            "\n{} ({}) {}",
            component.key(),
            component.change_type.as_str(),
            component.summary()
        );
        for line in &component.lines {
            let number = line
                .line_number
                .or(line.old_line_number)
                .map_or_else(String::new, |n| n.to_string());
            let text = match (&line.old_text, &line.new_text) {
                (Some(old), Some(new)) => format!("{old} => {new}"),
                (Some(text), None) | (None, Some(text)) => text.clone(),
                (None, None) => String::new(),
            };
            let _ = writeln!(out, "  {} {:>4}: {}", line.change_type.sigil(), number, text);
        }
    }

    if !diff.parameters.is_empty() {
        out.push_str("\nparameters\n");
        for p in &diff.parameters {
            let _ = writeln!(
                out,
                "  {:<8} {}: {} -> {}",
                p.change_type.as_str(),
                p.key,
                p.old_value.as_deref().unwrap_or("-"),
                p.new_value.as_deref().unwrap_or("-")
            );
        }
    }

    let _ = write!(out, "\nTotal: {}", diff.summary());
    out
}

/// Renders a change-log table.
#[must_use]
pub fn changes_table(changes: &[Change]) -> String {
    if changes.is_empty() {
        return "No changes recorded.".to_string();
    }
    let mut out = format!(
        "{:<4} {:<5} {:<8} {:<40} SUMMARY\n",
        "TO", "FROM", "TYPE", "FIELD"
    );
    out.push_str(&"-".repeat(90));
    out.push('\n');
    for c in changes {
        let from = c.from_version.map_or_else(|| "-".to_string(), |v| v.to_string());
        let _ = writeln!(
            out,
            "{:<4} {:<5} {:<8} {:<40} {}",
            c.to_version,
            from,
            c.change_type.as_str(),
            c.field_name,
            c.change_summary.as_deref().unwrap_or_default()
        );
    }
    let _ = write!(out, "\nTotal: {} changes", changes.len());
    out
}

/// Renders database statistics.
#[must_use]
pub fn stats_text(stats: &DatabaseStats) -> String {
    format!(
        "Templates: {}\nVersions: {}\nChanges: {}\nDatabase size: {} bytes",
        stats.template_count, stats.version_count, stats.change_count, stats.db_size_bytes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeType, ComponentDiff, ComponentType, LineChangeType, LineDiff, TemplateId, VersionId};
    use test_case::test_case;

    fn version(number: u32, active: bool) -> Version {
        Version {
            id: VersionId::new(format!("v{number}")),
            template_id: TemplateId::new("demo").unwrap(),
            version_number: number,
            content: "A\nB".to_string(),
            content_hash: ContentHasher::hash("A\nB"),
            is_active: active,
            created_by: "alice".to_string(),
            created_at: 0,
            comment: None,
            source_version: None,
        }
    }

    #[test_case("table", OutputFormat::Table)]
    #[test_case("JSON", OutputFormat::Json)]
    #[test_case("yml", OutputFormat::Yaml)]
    fn test_parse_format(input: &str, expected: OutputFormat) {
        assert_eq!(OutputFormat::parse(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_format() {
        assert!(matches!(OutputFormat::parse("xml"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_serialize_formats() {
        let v = version(1, true);
        assert!(serialize(&v, OutputFormat::Table).unwrap().is_none());

        let json = serialize(&v, OutputFormat::Json).unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["version_number"], 1);
        assert_eq!(parsed["template_id"], "demo");

        let yaml = serialize(&v, OutputFormat::Yaml).unwrap().unwrap();
        assert!(yaml.contains("version_number: 1"));
    }

    #[test]
    fn test_versions_table_marks_active() {
        let table = versions_table(&[version(1, false), version(2, true)]);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[2].starts_with("  1"));
        assert!(lines[3].starts_with("* 2"));
        assert!(table.ends_with("Total: 2 versions"));
        assert_eq!(versions_table(&[]), "No versions found.");
    }

    #[test]
    fn test_version_details_names_rollback_source() {
        let plain = version_details(&version(2, false));
        assert!(!plain.contains("Rolled back from"));

        let mut copy = version(4, true);
        copy.source_version = Some(1);
        copy.comment = Some("restore baseline".to_string());
        let details = version_details(&copy);
        assert!(details.contains("Version: demo@4"));
        assert!(details.contains("Rolled back from: 1"));
        assert!(details.contains("Comment: restore baseline"));
    }

    #[test]
    fn test_diff_text() {
        let diff = VersionDiff {
            template_id: TemplateId::new("demo").unwrap(),
            from_version: 1,
            to_version: 2,
            components: vec![ComponentDiff {
                component_type: ComponentType::Unparsed,
                name: "content".to_string(),
                change_type: ChangeType::Updated,
                old_content: Some("A\nB".to_string()),
                new_content: Some("A\nX".to_string()),
                lines: vec![LineDiff {
                    change_type: LineChangeType::Modified,
                    line_number: Some(2),
                    old_line_number: Some(2),
                    old_text: Some("B".to_string()),
                    new_text: Some("X".to_string()),
                }],
            }],
            parameters: Vec::new(),
        };
        let text = diff_text(&diff);
        assert!(text.starts_with("demo: version 1 -> 2"));
        assert!(text.contains("2: B => X"));
        assert!(text.ends_with("Total: +0 -0 ~1 lines"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long description", 10), "a very ...");
        assert_eq!(truncate("first\nsecond", 20), "first...");
    }
}
