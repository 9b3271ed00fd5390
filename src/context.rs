//! Context document assembly
//!
//! A context document is what gets handed to the chat endpoint as the first
//! user message. It is plain text delimited by literal markers:
//!
//! ```text
//! ----- START CONTEXT -----
//!
//! ----- PROJECT INFO -----
//!
//! Project Name: isy
//! Description: AI coding assistant
//!
//! ----- END PROJECT INFO -----
//!
//! ----- START PROJECT TREE -----
//!
//! isy/
//! └── src
//!     └── lib.rs
//!
//! ----- END PROJECT TREE -----
//!
//! ----- START FILE -----
//! FILE: src/lib.rs
//! ----- CONTENT -----
//! 1: pub mod context;
//! 2:
//! ----- END FILE -----
//!
//! ----- END CONTEXT -----
//! ```
//!
//! ## Building
//!
//! 1. The manifest is compiled into a [`PatternSet`]. A missing manifest is
//!    fatal: no partial document is ever returned. Lines that are not valid
//!    globs are left out and reported.
//! 2. The project root is walked in file-name order, never descending into
//!    the internal state folder or `.git`. Walk failures are fatal.
//! 3. Included files are rendered as a [`FileTree`] and merged with 1-based
//!    line numbers. A file that disappeared or cannot be read by then is
//!    skipped with a warning.
//!
//! Building is a pure read; persisting the document is up to the caller.

use crate::error::{IsyError, Result};
use crate::paths::{is_state_dir, VCS_DIR};
use crate::pattern::PatternSet;
use crate::tree::FileTree;
use crate::types::{ContextReport, ProjectInfo};
use crate::utils::{make_relative, normalize_path};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

pub(crate) const START_CONTEXT: &str = "----- START CONTEXT -----";
pub(crate) const END_CONTEXT: &str = "----- END CONTEXT -----";
pub(crate) const PROJECT_INFO: &str = "----- PROJECT INFO -----";
pub(crate) const END_PROJECT_INFO: &str = "----- END PROJECT INFO -----";
pub(crate) const START_TREE: &str = "----- START PROJECT TREE -----";
pub(crate) const END_TREE: &str = "----- END PROJECT TREE -----";
pub(crate) const START_FILE: &str = "----- START FILE -----";
pub(crate) const FILE_CONTENT: &str = "----- CONTENT -----";
pub(crate) const END_FILE: &str = "----- END FILE -----";

/// Builds context documents for one project
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    root: PathBuf,
    manifest: PathBuf,
    info: ProjectInfo,
}

impl ContextBuilder {
    /// Create a builder for `root`, reading patterns from `manifest`
    pub fn new(root: impl Into<PathBuf>, manifest: impl Into<PathBuf>, info: ProjectInfo) -> Self {
        Self {
            root: root.into(),
            manifest: manifest.into(),
            info,
        }
    }

    /// Root-relative paths of every included file, in walk order
    ///
    /// # Errors
    ///
    /// - [`IsyError::Traversal`] if the root or a directory below it cannot be read
    pub fn collect_files(&self, patterns: &PatternSet) -> Result<Vec<PathBuf>> {
        let mut included = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_excluded_dir(entry));

        for entry in walker {
            let entry = entry.map_err(|source| IsyError::Traversal {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                source,
            })?;

            if !is_file_like(&entry) {
                continue;
            }

            let relative = make_relative(entry.path(), &self.root)?;
            if patterns.is_included(&relative) {
                trace!("Included {:?}", relative);
                included.push(relative);
            }
        }

        debug!("{} files matched the manifest", included.len());
        Ok(included)
    }

    /// Build the document and report what went into it
    ///
    /// # Errors
    ///
    /// - [`IsyError::ManifestRead`] if the manifest is missing or unreadable
    /// - [`IsyError::Traversal`] if the project tree cannot be walked
    pub fn build(&self) -> Result<ContextReport> {
        info!("Building context for {:?}", self.root);

        let patterns = PatternSet::from_manifest(&self.manifest)?;
        let files = self.collect_files(&patterns)?;

        let tree = FileTree::from_paths(&self.root, files.iter().map(PathBuf::as_path));
        let (merged, skipped) = merge_files(&self.root, &files);
        let document = assemble(&self.info, &tree.render(), &merged);

        info!(
            "Context ready: {} files, {} skipped, {} bytes",
            files.len(),
            skipped.len(),
            document.len()
        );

        Ok(ContextReport {
            document,
            files,
            skipped,
            rejected_patterns: patterns.rejected().to_vec(),
        })
    }
}

/// Build the context document for `root`
///
/// Convenience wrapper around [`ContextBuilder::build`] returning only the
/// document.
pub fn build_context(root: &Path, manifest: &Path, info: &ProjectInfo) -> Result<String> {
    ContextBuilder::new(root, manifest, info.clone())
        .build()
        .map(|report| report.document)
}

/// Render one file block with 1-based line numbers
///
/// Content is split on `\n`, so content ending with a newline yields a final
/// empty numbered line.
pub fn render_file_block(label: &str, content: &str) -> String {
    let mut block = String::with_capacity(content.len() + label.len() + 96);
    block.push_str(START_FILE);
    block.push('\n');
    block.push_str(&format!("FILE: {}\n", label));
    block.push_str(FILE_CONTENT);
    block.push('\n');

    for (idx, line) in content.split('\n').enumerate() {
        block.push_str(&format!("{}: {}\n", idx + 1, line));
    }

    block.push_str(END_FILE);
    block.push_str("\n\n");
    block
}

/// Concatenate metadata, tree and file blocks between the context markers
pub fn assemble(info: &ProjectInfo, tree: &str, merged: &str) -> String {
    let mut doc = String::with_capacity(merged.len() + tree.len() + 512);

    doc.push_str(START_CONTEXT);
    doc.push_str("\n\n");

    doc.push_str(PROJECT_INFO);
    doc.push_str("\n\n");
    doc.push_str(&format!("Project Name: {}\n", info.name));
    doc.push_str(&format!("Description: {}\n", info.description));
    doc.push('\n');
    doc.push_str(END_PROJECT_INFO);
    doc.push_str("\n\n");

    doc.push_str(START_TREE);
    doc.push_str("\n\n");
    doc.push_str(tree);
    doc.push('\n');
    doc.push_str(END_TREE);
    doc.push_str("\n\n");

    doc.push_str(merged);
    doc.push_str(END_CONTEXT);
    doc.push_str("\n\n");
    doc
}

/// Merge file contents, returning the blocks and the files that were skipped
pub(crate) fn merge_files(root: &Path, files: &[PathBuf]) -> (String, Vec<PathBuf>) {
    let mut merged = String::new();
    let mut skipped = Vec::new();

    for relative in files {
        let full = root.join(relative);
        match read_regular_file(&full) {
            Ok(content) => {
                merged.push_str(&render_file_block(&normalize_path(relative), &content));
            }
            Err(e) => {
                warn!("Skipping {:?}: {}", relative, e);
                skipped.push(relative.clone());
            }
        }
    }

    (merged, skipped)
}

fn read_regular_file(path: &Path) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "is a directory",
        ));
    }
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && (is_state_dir(entry.file_name()) || entry.file_name() == VCS_DIR)
}

/// Regular files, plus symlinks that resolve to a file
fn is_file_like(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}
