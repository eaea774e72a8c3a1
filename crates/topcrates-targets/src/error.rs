//! Error types for deployment target operations.

/// Errors that can occur while describing targets or parsing platform filters.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// A `cfg(...)` expression could not be parsed.
    #[error("invalid cfg expression '{input}' at offset {position}: {detail}")]
    CfgParse {
        /// The expression text.
        input: String,
        /// Byte offset of the failure.
        position: usize,
        /// Description of the failure.
        detail: String,
    },

    /// A target triple is neither built in nor defined by the configuration.
    #[error("unknown target '{triple}' (built in: {builtin}; define others with [[closure.custom-target]])")]
    UnknownTarget {
        /// The requested triple.
        triple: String,
        /// Comma-separated list of the built-in triples.
        builtin: String,
    },

    /// A target definition is structurally wrong.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;
