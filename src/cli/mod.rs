//! CLI command implementations.
//!
//! Each function takes an open [`PromptVersionService`](crate::services::PromptVersionService)
//! and prints its result to stdout in the requested [`OutputFormat`].
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `template` | Create, list, show and delete templates |
//! | `version` | Create versions and inspect them |
//! | `compare` | Structured diff between two versions |
//! | `changes` | Recorded change log |
//! | `activate` | Soft rollback: repoint the active version |
//! | `rollback` | Hard rollback: copy an old version forward |
//! | `history` | Change-log maintenance |
//! | `status` | Database statistics |
//!
//! # Example Usage
//!
//! ```bash
//! promptvc template create session-summary --description "Summarize a coding session"
//! promptvc version create session-summary --from-file prompt.txt --param temperature=0.2
//! promptvc compare session-summary 1 2
//! promptvc rollback session-summary 1 --comment "revert tone change"
//! ```

mod history;
pub mod output;
mod template;
mod version;

pub use history::{cmd_activate, cmd_changes, cmd_compare, cmd_history_regenerate, cmd_rollback};
pub use output::OutputFormat;
pub use template::{
    cmd_status, cmd_template_create, cmd_template_delete, cmd_template_list, cmd_template_show,
};
pub use version::{
    CreateVersionArgs, cmd_version_active, cmd_version_components, cmd_version_create,
    cmd_version_list, cmd_version_parameters, cmd_version_show,
};
