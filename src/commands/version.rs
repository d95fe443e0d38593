//! Version command handler.

use promptvc::cli::{
    CreateVersionArgs, OutputFormat, cmd_version_active, cmd_version_components,
    cmd_version_create, cmd_version_list, cmd_version_parameters, cmd_version_show,
};
use promptvc::services::PromptVersionService;

use super::VersionAction;

/// Version command.
pub fn cmd_version(
    service: &PromptVersionService,
    action: VersionAction,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        VersionAction::Create {
            template,
            content,
            from_file,
            params,
            author,
            comment,
        } => {
            let args = CreateVersionArgs {
                template,
                content,
                from_file,
                params,
                author,
                comment,
            };
            cmd_version_create(service, args, format)
        },

        VersionAction::List { template } => cmd_version_list(service, template, format),

        VersionAction::Show { template, version } => {
            cmd_version_show(service, template, version, format)
        },

        VersionAction::Active { template } => cmd_version_active(service, template, format),

        VersionAction::Components { template, version } => {
            cmd_version_components(service, template, version, format)
        },

        VersionAction::Parameters { template, version } => {
            cmd_version_parameters(service, template, version, format)
        },
    }
}
