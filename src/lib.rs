//! # promptvc
//!
//! Version control for AI prompt templates.
//!
//! promptvc stores successive revisions of prompt templates, computes structured
//! differences between revisions, keeps a field-level change history and
//! executes reversible rollback.
//!
//! ## Features
//!
//! - Immutable, gapless, monotonically numbered versions per template
//! - Exactly one active version per template, switched atomically
//! - Component-aware diffs (meta prompt, input template, output template, ...)
//!   with LCS line alignment
//! - Append-only change log derived from diffs
//! - Soft rollback (repoint the active version) and hard rollback (copy an old
//!   version forward as a new one)
//! - Single-file `SQLite` storage
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptvc::services::PromptVersionService;
//! use promptvc::models::{NewTemplate, TemplateId};
//!
//! let service = PromptVersionService::in_memory()?;
//! let id = TemplateId::new("demo")?;
//! service.create_template(NewTemplate::new(id.clone()))?;
//!
//! let v1 = service.create_version(&id, "A\nB\nC", "alice", &[])?;
//! let v2 = service.create_version(&id, "A\nX\nC", "alice", &[])?;
//! let diff = service.compare(&id, 1, 2)?;
//! let v3 = service.rollback_hard(&id, 1, Some("revert X"), "alice")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::PromptVcConfig;
pub use models::{
    Change, ChangeType, Component, ComponentType, LineChangeType, LineDiff, Parameter,
    ParameterType, Template, TemplateId, Version, VersionDiff, VersionId,
};
pub use services::{
    ChangeTracker, ComponentSplitter, DiffEngine, PromptVersionService, RollbackController,
    VersionStore,
};
pub use storage::{ChangeLogStorage, VersionStorage};

/// Error type for promptvc operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotFound` | Template, version or version pair does not exist, or no version is active |
/// | `Conflict` | A concurrent activation/rollback or version allocation lost a race |
/// | `Validation` | Content yields no recognized component (recovered locally and logged) |
/// | `Storage` | The `SQLite` version store failed |
/// | `InvalidInput` | Malformed identifiers, parameters or CLI arguments |
/// | `OperationFailed` | Reading input or config files, or setting up logging, failed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A template, version or active version does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A concurrent mutation of the same template won the race.
    ///
    /// Raised when:
    /// - Another activation or rollback for the template is in flight
    /// - The active pointer moved between read and write
    /// - Two writers tried to allocate the same version number
    /// - The database stayed locked past the busy timeout
    ///
    /// Callers may retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Content failed to parse into any recognized component.
    ///
    /// Never returned from version creation: the version is stored with an
    /// `unparsed` projection (or no components) and the issue is logged.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The underlying persistence layer failed.
    #[error("storage operation '{operation}' failed: {cause}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation outside the version store failed.
    ///
    /// Raised when:
    /// - A config or content file cannot be read
    /// - Logging cannot be initialized or its file cannot be opened
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true if retrying the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type alias for promptvc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use promptvc::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
