//! Template command handler.

use promptvc::cli::{
    OutputFormat, cmd_template_create, cmd_template_delete, cmd_template_list, cmd_template_show,
};
use promptvc::services::PromptVersionService;

use super::TemplateAction;

/// Template command.
pub fn cmd_template(
    service: &PromptVersionService,
    action: TemplateAction,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TemplateAction::Create {
            id,
            description,
            system,
            language,
        } => cmd_template_create(service, id, description, system, language, format),

        TemplateAction::List => cmd_template_list(service, format),

        TemplateAction::Show { id } => cmd_template_show(service, id, format),

        TemplateAction::Delete { id } => cmd_template_delete(service, id),
    }
}
