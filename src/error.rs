//! Error taxonomy for collection, parsing and persistence.
//!
//! Collectors absorb these per source; the EVTX extractor and the store
//! surface them to the caller.

use std::io;
use thiserror::Error;

/// Errors produced by the triage engine
#[derive(Debug, Error)]
pub enum TriageError {
    /// Missing file, log or command
    #[error("not found: {0}")]
    NotFound(String),

    /// Corrupt or unexpected structure
    #[error("{0}")]
    Format(String),

    /// Access to a protected log or command was denied
    #[error("permission denied: {0}")]
    Permission(String),

    /// The host has no strategy for the requested operation
    #[error("platform unsupported: {0}")]
    PlatformUnsupported(String),

    /// An external command exceeded its time budget
    #[error("command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// An external command ran but reported failure
    #[error("command `{command}` failed ({code}): {stderr}")]
    Command { command: String, code: String, stderr: String },

    /// Management interface query failed
    #[error("query failed: {0}")]
    Query(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, TriageError>;

impl TriageError {
    /// Classify an IO error raised while touching `context`
    pub fn from_io(context: impl AsRef<str>, err: io::Error) -> Self {
        let context = context.as_ref();
        match err.kind() {
            io::ErrorKind::NotFound => TriageError::NotFound(context.to_string()),
            io::ErrorKind::PermissionDenied => {
                TriageError::Permission(format!("{}: {}", context, err))
            }
            _ => TriageError::Io(io::Error::new(err.kind(), format!("{}: {}", context, err))),
        }
    }

    /// True when the failure came from missing privileges
    pub fn is_permission(&self) -> bool {
        match self {
            TriageError::Permission(_) => true,
            TriageError::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            TriageError::Query(msg) => msg.contains("Access is denied") || msg.contains("0x80041003"),
            _ => false,
        }
    }
}
