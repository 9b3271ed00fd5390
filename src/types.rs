//! Core data types shared across isy modules
//!
//! ## Overview
//!
//! - **Project metadata**: `ProjectInfo` - name and description printed into the context
//! - **Results**: `ContextReport`, `CopyStats`, `BranchSelection`, `DriftStatus`
//! - **Snapshots**: `BranchInfo` - one directory under the branches root
//!
//! ## Examples
//!
//! ```rust
//! use isy::types::ProjectInfo;
//!
//! let info = ProjectInfo::new("isy", "Context builder for LLM chats");
//! assert_eq!(info.name, "isy");
//! ```

use crate::error::Result;
use crate::tokens::count_tokens;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project metadata consumed read-only by the context builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Project name
    pub name: String,
    /// Free-form project description
    pub description: String,
}

impl ProjectInfo {
    /// Create project metadata from a name and a description
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Result of a context build
///
/// Carries the document together with what went into it, so callers can
/// report on the build without re-parsing the document.
#[derive(Debug, Clone)]
pub struct ContextReport {
    /// The assembled context document
    pub document: String,
    /// Root-relative paths of the files merged into the document
    pub files: Vec<PathBuf>,
    /// Files that matched but could not be read at merge time
    pub skipped: Vec<PathBuf>,
    /// Manifest lines that were not valid globs and were left out
    pub rejected_patterns: Vec<String>,
}

impl ContextReport {
    /// Number of files whose content made it into the document
    pub fn merged_count(&self) -> usize {
        self.files.len() - self.skipped.len()
    }

    /// Size of the document in bytes
    pub fn size(&self) -> u64 {
        self.document.len() as u64
    }

    /// Tokens the document takes for `model`
    pub fn token_count(&self, model: &str) -> Result<usize> {
        count_tokens(model, &self.document)
    }
}

/// Statistics about a tree copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Regular files copied
    pub files: usize,
    /// Directories created
    pub directories: usize,
    /// Symbolic links recreated
    pub symlinks: usize,
    /// Bytes copied
    pub bytes: u64,
}

/// A branch snapshot on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    /// Hex identifier (directory name)
    pub id: String,
    /// Absolute or root-relative path of the snapshot directory
    pub path: PathBuf,
    /// Last modification time of the snapshot directory
    pub modified: DateTime<Utc>,
}

/// Outcome of branch selection before a code session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSelection {
    /// A new snapshot was created by copying the working tree
    Created {
        /// Branch identifier
        id: String,
        /// Snapshot directory
        path: PathBuf,
        /// Copy statistics
        stats: CopyStats,
    },
    /// An existing snapshot matched the working tree
    Reused {
        /// Branch identifier
        id: String,
        /// Snapshot directory
        path: PathBuf,
        /// Shared fingerprint of tree and snapshot
        fingerprint: String,
    },
}

impl BranchSelection {
    /// Branch identifier regardless of outcome
    pub fn id(&self) -> &str {
        match self {
            BranchSelection::Created { id, .. } | BranchSelection::Reused { id, .. } => id,
        }
    }

    /// Snapshot directory regardless of outcome
    pub fn path(&self) -> &PathBuf {
        match self {
            BranchSelection::Created { path, .. } | BranchSelection::Reused { path, .. } => path,
        }
    }
}

/// Comparison of the working tree against a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftStatus {
    /// Branch identifier
    pub branch: String,
    /// Fingerprint of the snapshot
    pub branch_fingerprint: String,
    /// Fingerprint of the working tree
    pub tree_fingerprint: String,
}

impl DriftStatus {
    /// Whether the working tree still matches the snapshot
    pub fn is_clean(&self) -> bool {
        self.branch_fingerprint == self.tree_fingerprint
    }
}
