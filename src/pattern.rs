//! Include-pattern matching for the context manifest
//!
//! The manifest (`.isycontext`) lists one gitignore-style pattern per line.
//! Unlike a `.gitignore`, a matching pattern *includes* a file in the context:
//!
//! ```text
//! # every Rust source file, at any depth
//! *.rs
//! # only the root configuration
//! /Cargo.toml
//! # everything below docs/
//! docs/
//! # but not this one
//! !docs/drafts.md
//! ```
//!
//! Supported syntax is exactly gitignore's: `*` stays inside one path
//! component, `**` crosses components, a leading `/` anchors to the project
//! root, a pattern without `/` matches the base name at any depth, a trailing
//! `/` only matches directories (and so every file beneath them), and a
//! leading `!` negates. The last matching pattern wins.
//!
//! Paths are matched in their forward-slash form, relative to the project
//! root, whatever the host separator is.

use crate::error::{IsyError, Result};
use crate::utils::normalize_path;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Root given to the gitignore matcher; `.` disables its prefix stripping so
/// relative paths are matched as-is.
const MATCH_ROOT: &str = ".";

/// Ordered, immutable set of include patterns
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    rejected: Vec<String>,
    matcher: Gitignore,
}

impl PatternSet {
    /// Compile a pattern set
    ///
    /// Blank lines and `#` comments are dropped. Order is preserved, which
    /// matters for negations.
    ///
    /// # Errors
    ///
    /// - [`IsyError::InvalidPattern`] if a line is not a valid glob
    pub fn new<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::compile(lines, true)
    }

    /// Compile a pattern set, leaving out lines that are not valid globs
    ///
    /// Rejected lines are logged and kept in [`PatternSet::rejected`]; they
    /// match nothing.
    pub fn lenient<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::compile(lines, false)
    }

    fn compile<I, S>(lines: I, strict: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(MATCH_ROOT);
        let mut patterns = Vec::new();
        let mut rejected = Vec::new();

        for line in lines {
            let line = line.as_ref().trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            match builder.add_line(None, line) {
                Ok(_) => patterns.push(line.to_string()),
                Err(e) if strict => {
                    return Err(IsyError::InvalidPattern(format!("'{}': {}", line, e)));
                }
                Err(e) => {
                    warn!("Skipping invalid pattern '{}': {}", line, e);
                    rejected.push(line.to_string());
                }
            }
        }

        let matcher = builder
            .build()
            .map_err(|e| IsyError::InvalidPattern(e.to_string()))?;

        debug!(
            "Compiled {} include patterns ({} rejected)",
            patterns.len(),
            rejected.len()
        );
        Ok(Self {
            patterns,
            rejected,
            matcher,
        })
    }

    /// Parse manifest text
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(text.lines())
    }

    /// Read and compile a manifest file
    ///
    /// A line that is not a valid glob is skipped with a warning, so one
    /// typo does not block the whole context.
    ///
    /// # Errors
    ///
    /// - [`IsyError::ManifestRead`] if the file is missing or unreadable
    pub fn from_manifest(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| IsyError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::lenient(text.lines())
    }

    /// Patterns in manifest order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Lines left out by [`PatternSet::lenient`]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// Whether the set holds no pattern (and so includes nothing)
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a root-relative file path is included
    ///
    /// Directory patterns match through the file's parent directories.
    pub fn is_included(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            return false;
        }
        matches!(
            self.matcher.matched_path_or_any_parents(&normalized, false),
            Match::Ignore(_)
        )
    }
}

/// Test a single pattern against a root-relative file path
///
/// An invalid pattern matches nothing and is logged.
pub fn matches(pattern: &str, path: &Path) -> bool {
    match PatternSet::new([pattern]) {
        Ok(set) => set.is_included(path),
        Err(e) => {
            warn!("Ignoring invalid pattern: {}", e);
            false
        }
    }
}
