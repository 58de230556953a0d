// error.rs — Error types for the enrichment job.

use std::path::PathBuf;

use thiserror::Error;

/// A failed call to the language-model service.
///
/// The two classes drive the retry logic: `Transient` is retried with
/// backoff, `Permanent` fails the record immediately.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Throttling, timeouts, temporary unavailability.
    #[error("transient generation failure: {reason}")]
    Transient { reason: String },

    /// Malformed request, rejected content, authorization failure, or an
    /// unusable response.
    #[error("permanent generation failure: {reason}")]
    Permanent { reason: String },
}

impl GenerationError {
    pub fn transient(reason: impl Into<String>) -> Self {
        GenerationError::Transient {
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        GenerationError::Permanent {
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient { .. })
    }
}

/// Errors that abort a whole enrichment run.
///
/// Per-record problems never show up here; they are classified and counted
/// in the run summary instead.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The store could not be scanned, so no records were observed.
    #[error("goal store scan failed: {0}")]
    Scan(#[source] ct_goal::GoalError),
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A value is out of range, or the HTTP client could not be built.
    #[error("invalid config: {0}")]
    Invalid(String),
}
