//! Error types for journal operations.
//!
//! Not-found is never an error in this crate — local ENOENT and remote 404
//! both surface as `Ok(None)` from the read paths.

use thiserror::Error;

/// Result type alias for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Errors that can occur in the journal core.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Malformed input caught before any I/O (bad identifier shape,
    /// mismatched vector lengths, unsafe path).
    #[error("{0}")]
    Usage(String),

    /// Network failure or non-2xx remote response, wrapped with the stage
    /// that failed (e.g. "Remote search failed: ...").
    #[error("{stage}: {message}")]
    Transport { stage: &'static str, message: String },

    /// Local I/O failure other than not-found.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Vector document serialization failure.
    #[error("vector document error: {0}")]
    VectorDocument(#[from] serde_json::Error),

    /// Embedding generation failure. Soft on the write path (logged,
    /// swallowed), hard when embedding is the sole purpose of the call.
    #[error("embedding derivation failed: {0}")]
    Derivation(String),
}

impl JournalError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn transport(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            stage,
            message: message.into(),
        }
    }
}
