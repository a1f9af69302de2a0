//! Error types for the out-of-band, fallible helpers
//!
//! The key-value contract itself never fails: a failed read is an absent
//! value and a failed write is a no-op. These errors are only surfaced by
//! helpers whose callers explicitly asked for a diagnosis, such as the
//! JSON encode/decode accessors.

use thiserror::Error;

/// Preferences error types
#[derive(Debug, Error)]
pub enum PrefsError {
    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary archive error
    #[error("Archive error: {0}")]
    Archive(#[from] bincode::Error),

    /// The stored value has an unexpected shape
    #[error("Type mismatch for key {key}: expected {expected}")]
    TypeMismatch {
        /// Key that was read
        key: String,
        /// Expected raw kind
        expected: &'static str,
    },

    /// The backend is read-only
    #[error("Preferences are read-only")]
    ReadOnly,
}

/// Result type for preferences helpers
pub type Result<T> = std::result::Result<T, PrefsError>;
