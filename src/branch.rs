//! Virtual branches: hashed snapshots of the working tree
//!
//! Before a code session the working tree is tied to a snapshot under the
//! branches root (`.isy/branches/<id>`):
//!
//! - an existing snapshot is only reused when its fingerprint equals the
//!   working tree's, otherwise selection fails with
//!   [`IsyError::DriftDetected`];
//! - a missing snapshot is created by copying the working tree.
//!
//! Snapshots are never rewritten once created. Comparing fingerprints is the
//! only thing done to them afterwards.
//!
//! ## Example
//!
//! ```rust,no_run
//! use isy::branch::BranchSelector;
//! use isy::paths::IsyPaths;
//!
//! # fn main() -> isy::Result<()> {
//! let selector = BranchSelector::for_project(&IsyPaths::new("."));
//! let selection = selector.select(None)?;
//! println!("Working on branch {}", selection.id());
//! # Ok(())
//! # }
//! ```

use crate::copy::copy_tree;
use crate::error::{IsyError, Result};
use crate::fingerprint::fingerprint;
use crate::paths::IsyPaths;
use crate::types::{BranchInfo, BranchSelection, DriftStatus};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Length of generated branch identifiers, in hex characters
pub const BRANCH_ID_LEN: usize = 10;

/// How many fresh identifiers are tried before giving up
const MAX_ID_ATTEMPTS: usize = 16;

/// Generate a short random hex identifier
pub fn generate_branch_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    uuid[..BRANCH_ID_LEN].to_string()
}

/// Picks or creates the snapshot a code session works against
#[derive(Debug, Clone)]
pub struct BranchSelector {
    project_root: PathBuf,
    branches_root: PathBuf,
    generate_id: fn() -> String,
}

impl BranchSelector {
    /// Selector for `project_root` keeping snapshots in `branches_root`
    pub fn new(project_root: impl Into<PathBuf>, branches_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            branches_root: branches_root.into(),
            generate_id: generate_branch_id,
        }
    }

    /// Selector using the project's standard layout
    pub fn for_project(paths: &IsyPaths) -> Self {
        Self::new(paths.root(), paths.branches())
    }

    /// Replace the identifier generator
    pub fn with_id_generator(mut self, generate_id: fn() -> String) -> Self {
        self.generate_id = generate_id;
        self
    }

    /// Snapshot directory for `id`
    ///
    /// # Errors
    ///
    /// - [`IsyError::InvalidBranchId`] if `id` is not a plain directory name
    pub fn branch_path(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.branches_root.join(id))
    }

    /// Snapshots, most recently modified first
    ///
    /// A missing branches root means there are no snapshots yet.
    pub fn list_branches(&self) -> Result<Vec<BranchInfo>> {
        let entries = match fs::read_dir(&self.branches_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut branches = Vec::new();
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_dir() {
                continue;
            }
            let modified: DateTime<Utc> = metadata.modified()?.into();
            branches.push(BranchInfo {
                id: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                modified,
            });
        }

        branches.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id)));
        debug!("Found {} branches in {:?}", branches.len(), self.branches_root);
        Ok(branches)
    }

    /// Compare the working tree with snapshot `id`
    ///
    /// # Errors
    ///
    /// - [`IsyError::BranchNotFound`] if the snapshot does not exist
    /// - [`IsyError::DirectoryUnreadable`] if either tree cannot be hashed
    pub fn check_drift(&self, id: &str) -> Result<DriftStatus> {
        let path = self.branch_path(id)?;
        if !path.is_dir() {
            return Err(IsyError::BranchNotFound(id.to_string()));
        }

        Ok(DriftStatus {
            branch: id.to_string(),
            branch_fingerprint: fingerprint(&path)?,
            tree_fingerprint: fingerprint(&self.project_root)?,
        })
    }

    /// Pick or create the snapshot for a code session
    ///
    /// - `Some(id)` with an existing snapshot: reused when fingerprints match
    /// - `Some(id)` without a snapshot: created under that name
    /// - `None`: created under a freshly generated, unused name
    ///
    /// # Errors
    ///
    /// - [`IsyError::DriftDetected`] if the working tree diverged from the snapshot
    /// - [`IsyError::BranchIdExhausted`] if no unused identifier could be generated
    /// - [`IsyError::Copy`] if creating the snapshot fails
    pub fn select(&self, id: Option<&str>) -> Result<BranchSelection> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.fresh_id()?,
        };
        let path = self.branch_path(&id)?;

        if path.is_dir() {
            let status = self.check_drift(&id)?;
            if !status.is_clean() {
                warn!("Working tree drifted from branch {}", id);
                return Err(IsyError::DriftDetected {
                    branch: id,
                    expected: status.branch_fingerprint,
                    actual: status.tree_fingerprint,
                });
            }
            info!("Reusing branch {}", id);
            return Ok(BranchSelection::Reused {
                id,
                path,
                fingerprint: status.tree_fingerprint,
            });
        }

        info!("Creating branch {} at {:?}", id, path);
        let stats = copy_tree(&self.project_root, &path)?;
        Ok(BranchSelection::Created { id, path, stats })
    }

    fn fresh_id(&self) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = (self.generate_id)();
            if !self.branch_path(&id)?.exists() {
                return Ok(id);
            }
            debug!("Branch id {} already taken, retrying", id);
        }
        Err(IsyError::BranchIdExhausted(MAX_ID_ATTEMPTS))
    }
}

fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(IsyError::InvalidBranchId(id.to_string()))
    }
}
