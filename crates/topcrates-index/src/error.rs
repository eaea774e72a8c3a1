//! Index error types.

use std::path::PathBuf;

/// Errors that can occur while reading a package index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Package name cannot be mapped into the index layout.
    #[error("invalid package name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A line of an index file is not a valid version record.
    #[error("malformed index record for '{name}' at line {line}: {source}")]
    MalformedRecord {
        name: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The index root does not exist or is not a directory.
    #[error("index not found at {path}")]
    IndexNotFound { path: PathBuf },

    /// A version requirement string cannot be parsed.
    #[error("invalid version requirement '{requirement}': {source}")]
    InvalidRequirement {
        requirement: String,
        #[source]
        source: semver::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
