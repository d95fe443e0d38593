//! Command handlers module.
//!
//! This module organizes the CLI subcommand dispatch into separate files:
//! - `template.rs`: Template management
//! - `version.rs`: Version creation and inspection
//! - `history.rs`: Change-log maintenance

mod history;
mod template;
mod version;

use std::path::PathBuf;

use clap::Subcommand;

pub use history::cmd_history;
pub use template::cmd_template;
pub use version::cmd_version;

/// Template subcommands.
#[derive(Subcommand)]
pub enum TemplateAction {
    /// Create a template.
    Create {
        /// Template id (lowercase letters, digits, '-' and '_').
        id: String,

        /// Description of the template.
        #[arg(short, long)]
        description: Option<String>,

        /// Mark the template as system-defined.
        #[arg(long)]
        system: bool,

        /// Language tag for parsed components (default from config).
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List templates.
    List,

    /// Show a template.
    Show {
        /// Template id.
        id: String,
    },

    /// Delete a template with all its versions and change history.
    Delete {
        /// Template id.
        id: String,
    },
}

/// Version subcommands.
#[derive(Subcommand)]
pub enum VersionAction {
    /// Create a new version. Content is read from stdin if neither inline
    /// content nor --from-file is given.
    Create {
        /// Template id.
        template: String,

        /// Inline content.
        content: Option<String>,

        /// Path to file containing the content.
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Parameter as key=value (repeatable).
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Author (default from config).
        #[arg(short, long, env = "PROMPTVC_AUTHOR")]
        author: Option<String>,

        /// Note attached to the version.
        #[arg(long)]
        comment: Option<String>,
    },

    /// List versions of a template.
    List {
        /// Template id.
        template: String,
    },

    /// Show a version.
    Show {
        /// Template id.
        template: String,

        /// Version number.
        version: u32,
    },

    /// Show the active version.
    Active {
        /// Template id.
        template: String,
    },

    /// Show a version's parsed components.
    Components {
        /// Template id.
        template: String,

        /// Version number.
        version: u32,
    },

    /// Show a version's parameters.
    Parameters {
        /// Template id.
        template: String,

        /// Version number.
        version: u32,
    },
}

/// History subcommands.
#[derive(Subcommand)]
pub enum HistoryAction {
    /// Re-record changes for versions that have none.
    Regenerate {
        /// Template id.
        template: String,
    },
}
