//! Configuration management.
//!
//! Configuration is read from a TOML file, then environment variables are
//! applied on top:
//!
//! ```toml
//! [storage]
//! path = "/var/lib/promptvc/promptvc.db"
//!
//! [versioning]
//! default_language = "en"
//! default_author = "alice"
//! diff_cache_capacity = 128
//! record_changes_on_create = true
//!
//! [logging]
//! format = "json"
//! level = "debug"
//! file = "/var/log/promptvc.log"
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `PROMPTVC_DB_PATH` | `storage.path` |
//! | `PROMPTVC_AUTHOR` | `versioning.default_author` |
//! | `PROMPTVC_LOG_FORMAT` | `logging.format` |
//! | `PROMPTVC_LOG_LEVEL` | `logging.level` |
//! | `PROMPTVC_LOG_FILE` | `logging.file` |

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_LANGUAGE;
use crate::services::DEFAULT_DIFF_CACHE_CAPACITY;
use crate::storage::SqliteDatabase;
use crate::{Error, Result};

/// Main configuration for promptvc.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptVcConfig {
    /// Storage settings.
    pub storage: StorageSettings,
    /// Versioning behavior.
    pub versioning: VersioningSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageSettings {
    /// Database file; the platform data directory is used when unset.
    pub path: Option<PathBuf>,
}

/// Versioning behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersioningSettings {
    /// Language tag for new templates.
    pub default_language: String,
    /// Author recorded when none is given.
    pub default_author: String,
    /// Number of cached diffs (0 disables the cache).
    pub diff_cache_capacity: usize,
    /// Record the change log automatically when a version is created.
    pub record_changes_on_create: bool,
}

impl Default for VersioningSettings {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            default_author: "unknown".to_string(),
            diff_cache_capacity: DEFAULT_DIFF_CACHE_CAPACITY,
            record_changes_on_create: true,
        }
    }
}

/// Logging settings, resolved by [`crate::observability::LoggingConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `promptvc=debug`.
    pub level: Option<String>,
    /// Append log output to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Versioning section.
    pub versioning: Option<ConfigFileVersioning>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileStorage {
    /// Database path.
    pub path: Option<String>,
}

/// Versioning section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileVersioning {
    /// Default language tag.
    pub default_language: Option<String>,
    /// Default author.
    pub default_author: Option<String>,
    /// Diff cache capacity.
    pub diff_cache_capacity: Option<usize>,
    /// Auto-record changes on create.
    pub record_changes_on_create: Option<bool>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub level: Option<String>,
    /// Log file.
    pub file: Option<String>,
}

impl PromptVcConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default config file path (`<config_dir>/promptvc/config.toml`).
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|d| d.config_dir().join("promptvc").join("config.toml"))
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::parse(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not a valid config file.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("invalid config file: {e}")))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns default configuration if no config file is found or it fails
    /// to load.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(path) = Self::default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            },
        }
    }

    /// Loads `explicit` if given (it must exist), else the default location,
    /// then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit config file cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies overrides from `lookup` (normally the process environment).
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = lookup("PROMPTVC_DB_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(author) = lookup("PROMPTVC_AUTHOR") {
            self.versioning.default_author = author;
        }
        if let Some(format) = lookup("PROMPTVC_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(level) = lookup("PROMPTVC_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(file) = lookup("PROMPTVC_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        self
    }

    /// Converts a `ConfigFile` to `PromptVcConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(storage) = file.storage {
            config.storage.path = storage.path.map(PathBuf::from);
        }
        if let Some(versioning) = file.versioning {
            if let Some(v) = versioning.default_language {
                config.versioning.default_language = v;
            }
            if let Some(v) = versioning.default_author {
                config.versioning.default_author = v;
            }
            if let Some(v) = versioning.diff_cache_capacity {
                config.versioning.diff_cache_capacity = v;
            }
            if let Some(v) = versioning.record_changes_on_create {
                config.versioning.record_changes_on_create = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.format = logging.format;
            config.logging.level = logging.level;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.path = Some(path.into());
        self
    }

    /// Resolves the database path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no path is configured and the
    /// platform data directory cannot be determined.
    pub fn db_path(&self) -> Result<PathBuf> {
        self.storage
            .path
            .clone()
            .or_else(SqliteDatabase::default_path)
            .ok_or_else(|| {
                Error::InvalidInput(
                    "No database path configured and no data directory available".to_string(),
                )
            })
    }
}
