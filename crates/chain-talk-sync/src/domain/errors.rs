//! # Domain Errors
//!
//! Error taxonomy for the ledger synchronizer.
//!
//! - `Retrieval` and `Persistence` abort the current step and leave the
//!   committed checkpoint where it was, so re-running the step is safe.
//! - `Configuration` is fatal and never retried.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while talking to the remote ledger or decoding what it returned.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Transport-level failure (connect, timeout, HTTP status).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Provider message
        message: String,
    },

    /// A response or log could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Top-level synchronizer error.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network/provider/decoding failure during a fetch.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Durable storage read or write failed.
    #[error("Persistence failed for {}: {message}", path.display())]
    Persistence {
        /// File that could not be read or written
        path: PathBuf,
        /// Underlying cause
        message: String,
    },

    /// Missing or invalid addressing/window parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SyncError {
    /// Build a persistence error for `path`.
    pub fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        SyncError::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether re-running the whole step from the last checkpoint may succeed.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, SyncError::Configuration(_))
    }
}
