//! Logging configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;
use crate::{Error, Result};

/// Filter used when nothing is configured.
pub const DEFAULT_LEVEL: &str = "warn";

/// Filter used with `--verbose`.
pub const VERBOSE_LEVEL: &str = "promptvc=debug,info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!(
                "unknown log format '{other}', expected 'pretty' or 'json'"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub level: String,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: DEFAULT_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Resolves settings. `verbose` wins over a configured level.
    ///
    /// An unknown format falls back to pretty.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let format = settings
            .format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();
        let level = if verbose {
            VERBOSE_LEVEL.to_string()
        } else {
            settings
                .level
                .clone()
                .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
        };
        Self {
            format,
            level,
            file: settings.file.clone(),
        }
    }

    /// Builds the subscriber filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the level is not a valid directive.
    pub fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.level)
            .map_err(|e| Error::InvalidInput(format!("invalid log level '{}': {e}", self.level)))
    }
}
