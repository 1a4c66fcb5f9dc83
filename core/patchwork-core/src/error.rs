//! Error types for patchwork-core operations.
//!
//! Probe ambiguity (missing plist keys, unreachable update host) is not an
//! error: the engine resolves it to the safe no-prompt branch. Errors here
//! are for genuinely broken collaborators - unspawnable processes, unreadable
//! descriptors, malformed plist documents we own.

use std::path::PathBuf;

/// All errors that can occur in patchwork-core operations.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    // ─────────────────────────────────────────────────────────────────────
    // Process Execution Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Command execution failed: {command}: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited non-zero: {command}: {details}")]
    CommandFailed { command: String, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Descriptor / Plist Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Descriptor not found: {0}")]
    DescriptorNotFound(PathBuf),

    #[error("Descriptor malformed: {path}: {source}")]
    DescriptorMalformed {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },

    #[error("Descriptor write failed: {path}: {source}")]
    DescriptorWriteFailed {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
}

/// Convenience type alias for Results using WatchError.
pub type Result<T> = std::result::Result<T, WatchError>;
