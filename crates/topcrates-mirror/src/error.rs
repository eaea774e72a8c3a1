//! Mirror error types.

use std::path::PathBuf;

use topcrates_index::IndexError;
use topcrates_targets::TargetError;

/// Errors that can occur while selecting, resolving, or writing a mirror.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The configuration is unreadable or inconsistent.
    #[error("invalid configuration {}: {detail}", path.display())]
    Config { path: PathBuf, detail: String },

    /// An exclusion pattern is not a valid glob.
    #[error("invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The download statistics file is unreadable or malformed.
    #[error("download statistics {}: {detail}", path.display())]
    Stats { path: PathBuf, detail: String },

    /// An index file already in the mirror has a line that is not a record.
    #[error("malformed mirror index {} at line {line}: {source}", path.display())]
    MalformedMirrorIndex {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Archive contents do not match the index checksum.
    #[error("checksum mismatch for '{name}@{version}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        version: String,
        expected: String,
        actual: String,
    },

    /// Filesystem error on a specific path.
    #[error("{detail} at {}: {source}", path.display())]
    Fs {
        path: PathBuf,
        detail: String,
        #[source]
        source: std::io::Error,
    },

    /// Index access error.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Deployment target error.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    pub(crate) fn fs(path: impl Into<PathBuf>, detail: &str, source: std::io::Error) -> Self {
        MirrorError::Fs {
            path: path.into(),
            detail: detail.to_string(),
            source,
        }
    }
}

/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, MirrorError>;
