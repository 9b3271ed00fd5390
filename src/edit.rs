//! Applying code modification steps to the working tree
//!
//! Line numbers in a step refer to the file as the model saw it, so the
//! edits of one step are applied from the bottom of the file upwards.
//! Overlapping ranges within a step are rejected.

use crate::error::{IsyError, Result};
use crate::paths::{is_state_dir, VCS_DIR};
use crate::responses::{CodeModificationStep, EditDetail, OperationType};
use crate::utils::is_contained;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// What applying a step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedChange {
    /// A file was written from scratch
    Created(PathBuf),
    /// A file was removed
    Deleted(PathBuf),
    /// Line ranges of a file were replaced
    Edited {
        /// Edited file
        path: PathBuf,
        /// Number of ranges replaced
        edits: usize,
    },
}

/// Replace lines `start..=end` (1-based) of `content` with `new_code`
///
/// Lines are split on `\n` only, so a trailing newline counts as a final
/// empty line.
///
/// # Errors
///
/// - [`IsyError::InvalidEdit`] if `start < 1`, `end` is past the last line or `start > end`
pub fn replace_lines(content: &str, start: usize, end: usize, new_code: &str) -> Result<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    if start < 1 || end > lines.len() || start > end {
        return Err(IsyError::invalid_edit(format!(
            "line range {}-{} outside 1-{}",
            start,
            end,
            lines.len()
        )));
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start - 1]);
    out.push(new_code);
    out.extend_from_slice(&lines[end..]);
    Ok(out.join("\n"))
}

/// Apply all edits of one step to `content`
pub fn apply_edits(content: &str, edits: &[EditDetail]) -> Result<String> {
    let mut ordered: Vec<&EditDetail> = edits.iter().collect();
    ordered.sort_by(|a, b| b.start_line.cmp(&a.start_line));

    for pair in ordered.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if upper.end_line >= lower.start_line {
            return Err(IsyError::invalid_edit(format!(
                "overlapping edits at lines {}-{} and {}-{}",
                upper.start_line, upper.end_line, lower.start_line, lower.end_line
            )));
        }
    }

    let mut content = content.to_string();
    for edit in ordered {
        content = replace_lines(&content, edit.start_line, edit.end_line, &edit.new_code)?;
    }
    Ok(content)
}

/// Resolve a step's path below `root`
///
/// # Errors
///
/// - [`IsyError::InvalidEdit`] if the path is empty, absolute, escapes the
///   root or points into `.isy` / `.git`
pub fn resolve_target(root: &Path, file_path: &str) -> Result<PathBuf> {
    let relative = Path::new(file_path);
    let first = relative.components().find(|c| !matches!(c, Component::CurDir));

    let reserved = match first {
        Some(Component::Normal(name)) => is_state_dir(name) || name == OsStr::new(VCS_DIR),
        Some(_) => false,
        None => {
            return Err(IsyError::invalid_edit("empty file path"));
        }
    };

    if !is_contained(relative) || reserved {
        return Err(IsyError::invalid_edit(format!(
            "{:?} is outside the editable project tree",
            file_path
        )));
    }
    Ok(root.join(relative))
}

/// Apply one step below `root`
///
/// # Errors
///
/// - [`IsyError::InvalidEdit`] for bad paths, line ranges, or a missing file
/// - [`IsyError::Io`] if the file cannot be read or written
pub fn apply_step(root: &Path, step: &CodeModificationStep) -> Result<AppliedChange> {
    let path = resolve_target(root, &step.file_path)?;
    debug!("Applying {} to {:?}", step.operation_type, path);

    let change = match step.operation_type {
        OperationType::Create => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content: String = step.edits.iter().map(|e| e.new_code.as_str()).collect();
            fs::write(&path, content)?;
            AppliedChange::Created(path)
        }
        OperationType::Delete => {
            fs::remove_file(&path).map_err(|e| missing_or_io(e, &step.file_path))?;
            AppliedChange::Deleted(path)
        }
        OperationType::Edit => {
            let content =
                fs::read_to_string(&path).map_err(|e| missing_or_io(e, &step.file_path))?;
            let updated = apply_edits(&content, &step.edits)?;
            fs::write(&path, updated)?;
            AppliedChange::Edited {
                path,
                edits: step.edits.len(),
            }
        }
    };

    info!("Applied {} on {}", step.operation_type, step.file_path);
    Ok(change)
}

fn missing_or_io(err: io::Error, file_path: &str) -> IsyError {
    if err.kind() == io::ErrorKind::NotFound {
        IsyError::invalid_edit(format!("{} does not exist", file_path))
    } else {
        IsyError::Io(err)
    }
}
