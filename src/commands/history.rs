//! History command handler.

use promptvc::cli::{OutputFormat, cmd_history_regenerate};
use promptvc::services::PromptVersionService;

use super::HistoryAction;

/// History command.
pub fn cmd_history(
    service: &PromptVersionService,
    action: HistoryAction,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        HistoryAction::Regenerate { template } => {
            cmd_history_regenerate(service, template, format)
        },
    }
}
