//! On-disk layout of an isy project
//!
//! ```text
//! <root>/
//!   .isycontext            manifest of include patterns
//!   .isy/
//!     config.json
//!     token_usage.json
//!     last_context
//!     branches/<id>/
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Name of the internal state folder, excluded from every traversal
pub const STATE_DIR: &str = ".isy";

/// Name of the version-control folder, excluded from context traversal
pub const VCS_DIR: &str = ".git";

/// Manifest file name at the project root
pub const MANIFEST_FILE: &str = ".isycontext";

/// Directory holding branch snapshots, inside the state folder
pub const BRANCHES_DIR: &str = "branches";

/// Configuration file name, inside the state folder
pub const CONFIG_FILE: &str = "config.json";

/// Usage ledger file name, inside the state folder
pub const USAGE_FILE: &str = "token_usage.json";

/// Last generated context document, inside the state folder
pub const LAST_CONTEXT_FILE: &str = "last_context";

/// Whether a directory entry name is the internal state folder
pub fn is_state_dir(name: &OsStr) -> bool {
    name == STATE_DIR
}

/// Resolved paths for one project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsyPaths {
    root: PathBuf,
}

impl IsyPaths {
    /// Layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Internal state folder
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Context manifest
    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Project configuration
    pub fn config(&self) -> PathBuf {
        self.state_dir().join(CONFIG_FILE)
    }

    /// Usage ledger
    pub fn usage(&self) -> PathBuf {
        self.state_dir().join(USAGE_FILE)
    }

    /// Last generated context
    pub fn last_context(&self) -> PathBuf {
        self.state_dir().join(LAST_CONTEXT_FILE)
    }

    /// Branches root
    pub fn branches(&self) -> PathBuf {
        self.state_dir().join(BRANCHES_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = IsyPaths::new("/work/project");
        assert_eq!(paths.manifest(), PathBuf::from("/work/project/.isycontext"));
        assert_eq!(paths.config(), PathBuf::from("/work/project/.isy/config.json"));
        assert_eq!(paths.branches(), PathBuf::from("/work/project/.isy/branches"));
        assert!(is_state_dir(OsStr::new(".isy")));
        assert!(!is_state_dir(OsStr::new(".git")));
    }
}
