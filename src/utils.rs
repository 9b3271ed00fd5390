//! Utility functions for isy
//!
//! This module provides small helpers used throughout the crate: permission
//! handling, symbolic links, path normalization, atomic writes and byte
//! formatting.
//!
//! ## Categories of Utilities
//!
//! ### File Operations
//! - Streaming a file into a running digest
//! - Atomic file writing
//! - Permission handling (cross-platform)
//! - Symbolic link operations
//!
//! ### Path Manipulation
//! - Converting absolute paths to root-relative paths
//! - Forward-slash normalization for pattern matching and display
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use crate::utils::{normalize_path, format_bytes};
//! use std::path::Path;
//!
//! assert_eq!(normalize_path(Path::new("./src/main.rs")), "src/main.rs");
//! assert_eq!(format_bytes(1536), "1.50 KB");
//! ```

use crate::error::{IsyError, Result};
use sha2::Digest;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Stream a file's bytes into a running digest
///
/// Uses an 8KB buffer so large files are never loaded whole. Returns the
/// number of bytes fed into the hasher.
///
/// # Errors
///
/// Returns the raw `io::Error` so callers can wrap it in the error variant
/// that fits their operation.
pub fn stream_into<D: Digest>(hasher: &mut D, path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; 8192]; // 8KB buffer
    let mut total = 0u64;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    trace!("Hashed {} bytes from {:?}", total, path);
    Ok(total)
}

/// Get Unix permissions from metadata
#[cfg(unix)]
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Get permissions from metadata (Windows implementation)
///
/// Maps the read-only attribute to Unix-like bits so the value round-trips
/// through [`set_permissions`].
#[cfg(windows)]
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    let mut mode = if metadata.permissions().readonly() { 0o444 } else { 0o644 };
    if metadata.is_dir() {
        mode |= 0o111;
    }
    mode
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Set permissions (Windows implementation)
///
/// Only the owner write bit is meaningful: it toggles the read-only attribute.
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly((mode & 0o200) == 0);
    fs::set_permissions(path, perms)
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Create a symlink (Windows)
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    if target.is_dir() {
        symlink_dir(target, link)
    } else {
        symlink_file(target, link)
    }
}

/// Make a path relative to a base path
///
/// Tries a lexical strip first so symbolic links keep their own path, and
/// only canonicalizes both sides when that fails.
///
/// # Errors
///
/// - [`IsyError::Internal`] if the path is not under the base path
/// - [`IsyError::Io`] if canonicalization fails (fallback case only)
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    if let Ok(relative) = path.strip_prefix(base) {
        return Ok(relative.to_path_buf());
    }

    let path_canon = path.canonicalize()?;
    let base_canon = base.canonicalize()?;

    path_canon
        .strip_prefix(&base_canon)
        .map(|p| p.to_path_buf())
        .map_err(|_| {
            IsyError::internal(format!(
                "Path {:?} is not relative to {:?}",
                path_canon, base_canon
            ))
        })
}

/// Render a relative path with forward slashes and no leading `./`
///
/// This is the form used for pattern matching, the `FILE:` headers and the
/// tree, independent of the host separator.
pub fn normalize_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a relative path stays inside its root (no `..`, no absolute prefix)
pub fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Format bytes in human-readable form
///
/// Uses 1024 as the conversion factor. Values below 1 KB are whole numbers,
/// larger values carry two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file lives in the target's directory so the final rename
/// never crosses filesystems. The target is either fully written or left
/// untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| IsyError::Io(e.error))?;

    trace!("Atomically wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}
