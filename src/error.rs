//! Centralized error types for inboxpeek.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the inboxpeek library.
///
/// Content problems (bad encodings, broken part trees, missing links) are
/// never errors; they degrade to empty or passthrough values. What remains
/// here are collaborator and channel failures, which callers must be able
/// to tell apart from "nothing found".
#[derive(Error, Debug)]
pub enum InboxError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A message envelope or event file could not be deserialized.
    #[error("Invalid message envelope: {0}")]
    InvalidEnvelope(String),

    /// A backend request (latest message, detail, verification trigger) failed.
    #[error("Backend request '{operation}' failed: {reason}")]
    Backend {
        operation: &'static str,
        reason: String,
    },

    /// The push transport could not be opened or written to.
    #[error("Push transport error: {0}")]
    Transport(String),

    /// An operation needed an address but no lookup has happened yet.
    #[error("No address has been looked up yet")]
    NotSubscribed,

    /// An operation needed a selected message but none is loaded.
    #[error("No message is currently selected")]
    NoActiveMessage,
}

/// Convenience alias for `Result<T, InboxError>`.
pub type Result<T> = std::result::Result<T, InboxError>;

impl InboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Backend` variant for a failed collaborator call.
    pub fn backend(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation,
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for InboxError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidEnvelope(e.to_string())
    }
}
