//! Error types for isy
//!
//! This module defines all error types that can occur during isy operations.
//! Filesystem failures carry the path they happened on so the CLI can print
//! an actionable message.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the isy library
pub type Result<T> = std::result::Result<T, IsyError>;

/// Main error type for all isy operations
#[derive(Debug, Error)]
pub enum IsyError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The context manifest is missing or unreadable
    #[error("Cannot read manifest {path:?}: {source}")]
    ManifestRead {
        /// Path to the manifest
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The project root (or a directory below it) could not be traversed
    #[error("Cannot traverse {path:?}: {source}")]
    Traversal {
        /// Directory that failed
        path: PathBuf,
        /// Underlying walk failure
        #[source]
        source: walkdir::Error,
    },

    /// A directory could not be read while computing its fingerprint
    #[error("Cannot fingerprint {path:?}: {source}")]
    DirectoryUnreadable {
        /// Entry that failed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Any I/O failure while copying a tree
    #[error("Copy failed at {path:?}: {source}")]
    Copy {
        /// Path being copied when the failure happened
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Live tree and snapshot fingerprints differ
    #[error("Working tree differs from branch {branch} (branch: {expected}, tree: {actual})")]
    DriftDetected {
        /// Branch identifier
        branch: String,
        /// Fingerprint of the snapshot
        expected: String,
        /// Fingerprint of the live tree
        actual: String,
    },

    /// Pattern parsing error
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Branch snapshot does not exist
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// Branch identifier is not a plain directory name
    #[error("Invalid branch id: {0:?}")]
    InvalidBranchId(String),

    /// Could not generate an unused branch identifier
    #[error("Could not generate an unused branch id after {0} attempts")]
    BranchIdExhausted(usize),

    /// Project has not been initialized
    #[error("Project not initialized: {0:?} does not exist")]
    ConfigNotFound(PathBuf),

    /// Project already initialized
    #[error("Project already initialized at {0:?}")]
    AlreadyInitialized(PathBuf),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Chat endpoint failure
    #[error("Chat error: {0}")]
    Chat(String),

    /// A code modification could not be applied
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for IsyError {
    fn from(err: reqwest::Error) -> Self {
        IsyError::Chat(err.to_string())
    }
}

impl IsyError {
    /// Create a chat error with a custom message
    pub fn chat(msg: impl Into<String>) -> Self {
        IsyError::Chat(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        IsyError::Config(msg.into())
    }

    /// Create an invalid edit error with a custom message
    pub fn invalid_edit(msg: impl Into<String>) -> Self {
        IsyError::InvalidEdit(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        IsyError::Internal(msg.into())
    }

    /// Check if an interactive session can keep going after this error
    ///
    /// Chat and edit failures only affect one turn; everything else means the
    /// session's inputs are broken.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IsyError::Chat(_) | IsyError::InvalidEdit(_) | IsyError::Json(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            IsyError::ManifestRead { path, .. } => {
                format!(
                    "Cannot read manifest {:?}. Run 'isy init' or create it with one pattern per line.",
                    path
                )
            }
            IsyError::ConfigNotFound(path) => {
                format!("No configuration at {:?}. Run 'isy init' first.", path)
            }
            IsyError::DriftDetected { branch, .. } => {
                format!(
                    "The current codebase differs from branch '{}'. Operation aborted.",
                    branch
                )
            }
            IsyError::BranchNotFound(id) => {
                format!("Branch '{}' not found. Use 'isy branches' to list snapshots.", id)
            }
            _ => self.to_string(),
        }
    }
}
