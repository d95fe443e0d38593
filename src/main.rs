//! Binary entry point for promptvc.
//!
//! This binary provides the CLI interface for prompt template versioning.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{HistoryAction, TemplateAction, VersionAction, cmd_history, cmd_template, cmd_version};
use promptvc::PromptVcConfig;
use promptvc::cli::{
    OutputFormat, cmd_activate, cmd_changes, cmd_compare, cmd_rollback, cmd_status,
};
use promptvc::observability::{self, LoggingConfig};
use promptvc::services::PromptVersionService;
use std::path::PathBuf;
use std::process::ExitCode;

/// promptvc - Version control for AI prompt templates.
#[derive(Parser)]
#[command(name = "promptvc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database (overrides config).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format: table, json or yaml.
    #[arg(short, long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Manage templates.
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Create and inspect versions.
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },

    /// Compare two versions.
    Compare {
        /// Template id.
        template: String,

        /// Source version.
        from: u32,

        /// Target version.
        to: u32,
    },

    /// Show recorded changes.
    Changes {
        /// Template id.
        template: String,

        /// Target version.
        to: u32,

        /// Include changes into every earlier version as well.
        #[arg(long)]
        all: bool,
    },

    /// Make a version active (soft rollback).
    Activate {
        /// Template id.
        template: String,

        /// Version number.
        version: u32,
    },

    /// Copy a version forward as the new active version (hard rollback).
    Rollback {
        /// Template id.
        template: String,

        /// Version number to restore.
        version: u32,

        /// Reason recorded in the change log.
        #[arg(long)]
        comment: Option<String>,

        /// Author of the new version (default from config).
        #[arg(short, long, env = "PROMPTVC_AUTHOR")]
        author: Option<String>,
    },

    /// Maintain the change log.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show database statistics.
    Status,
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match PromptVcConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Some(db) = cli.db.clone() {
        config = config.with_db_path(db);
    }

    if let Err(e) = observability::init(&LoggingConfig::from_settings(&config.logging, cli.verbose))
    {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &PromptVcConfig) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::parse(&cli.format)?;
    let service = PromptVersionService::open(config)?;

    match cli.command {
        Commands::Template { action } => cmd_template(&service, action, format),

        Commands::Version { action } => cmd_version(&service, action, format),

        Commands::Compare { template, from, to } => {
            cmd_compare(&service, template, from, to, format)
        },

        Commands::Changes { template, to, all } => cmd_changes(&service, template, to, all, format),

        Commands::Activate { template, version } => {
            cmd_activate(&service, template, version, format)
        },

        Commands::Rollback {
            template,
            version,
            comment,
            author,
        } => cmd_rollback(&service, template, version, comment, author, format),

        Commands::History { action } => cmd_history(&service, action, format),

        Commands::Status => cmd_status(&service, format),
    }
}
