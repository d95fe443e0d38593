//! Version CLI commands.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]
// CLI commands take owned strings from clap parsing
#![allow(clippy::needless_pass_by_value)]

use std::io::Read;
use std::path::PathBuf;

use super::output::{self, OutputFormat};
use crate::models::{Parameter, TemplateId};
use crate::services::{PromptVersionService, VersionDraft};
use crate::Error;

/// Arguments for the `version create` command.
#[derive(Debug, Clone, Default)]
pub struct CreateVersionArgs {
    /// Template id.
    pub template: String,
    /// Inline content.
    pub content: Option<String>,
    /// File to read content from.
    pub from_file: Option<PathBuf>,
    /// `key=value` parameter assignments.
    pub params: Vec<String>,
    /// Author; falls back to the configured default.
    pub author: Option<String>,
    /// Optional note.
    pub comment: Option<String>,
}

impl CreateVersionArgs {
    /// Creates arguments for a template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Default::default()
        }
    }

    /// Sets inline content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the content file.
    #[must_use]
    pub fn with_file(mut self, path: PathBuf) -> Self {
        self.from_file = Some(path);
        self
    }

    /// Adds a `key=value` parameter.
    #[must_use]
    pub fn with_param(mut self, assignment: impl Into<String>) -> Self {
        self.params.push(assignment.into());
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builds a draft, reading content from the file or `stdin` when no
    /// inline content is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if both inline content and a file are
    /// given or a parameter is malformed, and [`Error::OperationFailed`] if
    /// the content cannot be read.
    pub fn into_draft(
        self,
        default_author: &str,
        stdin: impl Read,
    ) -> crate::Result<VersionDraft> {
        let content = match (self.content, &self.from_file) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidInput(
                    "Provide content inline or with --from-file, not both".to_string(),
                ));
            },
            (Some(content), None) => content,
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
                    operation: "read_content_file".to_string(),
                    cause: format!("{}: {e}", path.display()),
                })?
            },
            (None, None) => read_all(stdin)?,
        };

        let parameters = self
            .params
            .iter()
            .map(String::as_str)
            .map(Parameter::parse_assignment)
            .collect::<crate::Result<Vec<_>>>()?;
        let author = self
            .author
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| default_author.to_string());

        let mut draft = VersionDraft::new(content, author).with_parameters(parameters);
        draft.comment = self.comment;
        Ok(draft)
    }
}

fn read_all(mut reader: impl Read) -> crate::Result<String> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| Error::OperationFailed {
            operation: "read_stdin".to_string(),
            cause: e.to_string(),
        })?;
    Ok(content)
}

/// Creates a version.
///
/// # Errors
///
/// Returns an error if the input is invalid or the template does not exist.
pub fn cmd_version_create(
    service: &PromptVersionService,
    args: CreateVersionArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let template_id = TemplateId::new(args.template.clone())?;
    let draft = args.into_draft(&service.settings().default_author, std::io::stdin().lock())?;
    let version = service.create_version_from(&template_id, draft)?;

    match output::serialize(&version, format)? {
        Some(rendered) => println!("{rendered}"),
        None => {
            println!("Created {}", version.label());
            println!("  Hash: {}", version.content_hash);
            if version.is_active {
                println!("  Active: yes");
            }
        },
    }
    Ok(())
}

/// Lists the versions of a template.
///
/// # Errors
///
/// Returns an error if the template does not exist.
pub fn cmd_version_list(
    service: &PromptVersionService,
    template: String,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let versions = service.list_versions(&TemplateId::new(template)?)?;
    let rendered = output::serialize(&versions, format)?
        .unwrap_or_else(|| output::versions_table(&versions));
    println!("{rendered}");
    Ok(())
}

/// Shows one version.
///
/// # Errors
///
/// Returns an error if the template or version does not exist.
pub fn cmd_version_show(
    service: &PromptVersionService,
    template: String,
    number: u32,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = service.get_version(&TemplateId::new(template)?, number)?;
    let rendered = output::serialize(&version, format)?
        .unwrap_or_else(|| output::version_details(&version));
    println!("{rendered}");
    Ok(())
}

/// Shows the active version.
///
/// # Errors
///
/// Returns an error if the template does not exist or has no versions.
pub fn cmd_version_active(
    service: &PromptVersionService,
    template: String,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = service.get_active_version(&TemplateId::new(template)?)?;
    let rendered = output::serialize(&version, format)?
        .unwrap_or_else(|| output::version_details(&version));
    println!("{rendered}");
    Ok(())
}

/// Shows a version's parsed components.
///
/// # Errors
///
/// Returns an error if the template or version does not exist.
pub fn cmd_version_components(
    service: &PromptVersionService,
    template: String,
    number: u32,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = service.get_version(&TemplateId::new(template)?, number)?;
    let components = service.get_components(&version.id)?;
    let rendered = output::serialize(&components, format)?
        .unwrap_or_else(|| output::components_table(&components));
    println!("{rendered}");
    Ok(())
}

/// Shows a version's parameters.
///
/// # Errors
///
/// Returns an error if the template or version does not exist.
pub fn cmd_version_parameters(
    service: &PromptVersionService,
    template: String,
    number: u32,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let version = service.get_version(&TemplateId::new(template)?, number)?;
    let parameters = service.get_parameters(&version.id)?;
    let rendered = output::serialize(&parameters, format)?
        .unwrap_or_else(|| output::parameters_table(&parameters));
    println!("{rendered}");
    Ok(())
}
