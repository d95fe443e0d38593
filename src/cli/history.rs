//! Diff, change-log, activation and rollback CLI commands.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]
// CLI commands take owned strings from clap parsing
#![allow(clippy::needless_pass_by_value)]

use super::output::{self, OutputFormat};
use crate::models::TemplateId;
use crate::services::PromptVersionService;

/// Compares two versions.
///
/// # Errors
///
/// Returns an error if the template or either version does not exist.
pub fn cmd_compare(
    service: &PromptVersionService,
    template: String,
    from: u32,
    to: u32,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let diff = service.compare(&TemplateId::new(template)?, from, to)?;
    let rendered =
        output::serialize(&diff, format)?.unwrap_or_else(|| output::diff_text(&diff));
    println!("{rendered}");
    Ok(())
}

/// Shows recorded changes into `to`, or the whole log up to `to` with `all`.
///
/// # Errors
///
/// Returns an error if the template or version does not exist.
pub fn cmd_changes(
    service: &PromptVersionService,
    template: String,
    to: u32,
    all: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let template_id = TemplateId::new(template)?;
    let changes = if all {
        service.history(&template_id, to)?
    } else {
        service.get_changes(&template_id, to)?
    };
    let rendered = output::serialize(&changes, format)?
        .unwrap_or_else(|| output::changes_table(&changes));
    println!("{rendered}");
    Ok(())
}

/// Activates a version (soft rollback).
///
/// # Errors
///
/// Returns an error if the template or version does not exist, or another
/// activation is in flight.
pub fn cmd_activate(
    service: &PromptVersionService,
    template: String,
    version: u32,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = service.activate(&TemplateId::new(template)?, version)?;
    match output::serialize(&version, format)? {
        Some(rendered) => println!("{rendered}"),
        None => println!("{} is now active.", version.label()),
    }
    Ok(())
}

/// Copies a version forward as a new active version (hard rollback).
///
/// # Errors
///
/// Returns an error if the template or version does not exist, or another
/// activation is in flight.
pub fn cmd_rollback(
    service: &PromptVersionService,
    template: String,
    version: u32,
    comment: Option<String>,
    author: Option<String>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let author = author.unwrap_or_else(|| service.settings().default_author.clone());
    let created = service.rollback_hard(
        &TemplateId::new(template)?,
        version,
        comment.as_deref(),
        &author,
    )?;
    match output::serialize(&created, format)? {
        Some(rendered) => println!("{rendered}"),
        None => println!(
            "Rolled back to version {version}: created {} (active).",
            created.label()
        ),
    }
    Ok(())
}

/// Rebuilds missing change-log entries.
///
/// # Errors
///
/// Returns an error if the template does not exist.
pub fn cmd_history_regenerate(
    service: &PromptVersionService,
    template: String,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let changes = service.regenerate_changes(&TemplateId::new(template)?)?;
    match output::serialize(&changes, format)? {
        Some(rendered) => println!("{rendered}"),
        None => println!("Recorded {} changes.", changes.len()),
    }
    Ok(())
}
