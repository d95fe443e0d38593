//! Template CLI commands.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]
// CLI commands take owned strings from clap parsing
#![allow(clippy::needless_pass_by_value)]

use super::output::{self, OutputFormat};
use crate::models::TemplateId;
use crate::services::PromptVersionService;

/// Creates a template.
///
/// # Errors
///
/// Returns an error if the id is invalid or the template already exists.
pub fn cmd_template_create(
    service: &PromptVersionService,
    id: String,
    description: Option<String>,
    system: bool,
    language: Option<String>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = service.new_template(TemplateId::new(id)?);
    if let Some(description) = description {
        request = request.with_description(description);
    }
    if let Some(language) = language {
        request = request.with_language(language);
    }
    if system {
        request = request.system();
    }

    let template = service.create_template(request)?;
    match output::serialize(&template, format)? {
        Some(rendered) => println!("{rendered}"),
        None => println!("Template '{}' created.", template.id),
    }
    Ok(())
}

/// Lists templates.
///
/// # Errors
///
/// Returns an error if the database cannot be read.
pub fn cmd_template_list(
    service: &PromptVersionService,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let templates = service.list_templates()?;
    let rendered = output::serialize(&templates, format)?
        .unwrap_or_else(|| output::templates_table(&templates));
    println!("{rendered}");
    Ok(())
}

/// Shows a template.
///
/// # Errors
///
/// Returns an error if the template does not exist.
pub fn cmd_template_show(
    service: &PromptVersionService,
    id: String,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let template = service.get_template(&TemplateId::new(id)?)?;
    let rendered = output::serialize(&template, format)?
        .unwrap_or_else(|| output::template_details(&template));
    println!("{rendered}");
    Ok(())
}

/// Deletes a template with all its versions and change history.
///
/// # Errors
///
/// Returns an error if the template does not exist.
pub fn cmd_template_delete(
    service: &PromptVersionService,
    id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = TemplateId::new(id)?;
    service.delete_template(&id)?;
    println!("Template '{id}' deleted.");
    Ok(())
}

/// Shows database statistics.
///
/// # Errors
///
/// Returns an error if the database cannot be queried.
pub fn cmd_status(
    service: &PromptVersionService,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = service.stats()?;
    let rendered =
        output::serialize(&stats, format)?.unwrap_or_else(|| output::stats_text(&stats));
    println!("{rendered}");
    Ok(())
}
