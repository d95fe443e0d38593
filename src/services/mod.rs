//! Business logic services.
//!
//! Services orchestrate storage backends and provide high-level operations.

mod change_tracker;
mod component_splitter;
mod diff_engine;
mod hasher;
mod prompt_versions;
mod rollback;
mod version_store;

pub use change_tracker::{ChangeTracker, changes_from_diff};
pub use component_splitter::{
    CONTENT_NAME, ComponentSplitter, PREAMBLE_NAME, SplitIssue, SplitOutcome,
};
pub use diff_engine::{
    DEFAULT_DIFF_CACHE_CAPACITY, DiffEngine, diff_components, diff_lines, diff_parameters,
};
pub use hasher::{ContentHasher, SHORT_HASH_LEN};
pub use prompt_versions::PromptVersionService;
pub use rollback::{RollbackController, RollbackStrategy};
pub use version_store::{VersionDraft, VersionStore};
