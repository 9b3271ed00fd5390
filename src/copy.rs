//! Recursive directory copy used to create branch snapshots
//!
//! The copy mirrors the source tree minus the internal state folder:
//!
//! - directories are recreated and get the source permission bits once their
//!   content is in place (so read-only directories can still be filled);
//! - regular files are created or overwritten, copied byte for byte, then
//!   given the source permission bits;
//! - symbolic links are recreated as links, never followed.
//!
//! The copy fails fast on the first I/O error and leaves whatever was already
//! copied on disk. Re-running it against an unchanged source yields the same
//! destination content.

use crate::error::{IsyError, Result};
use crate::paths::{is_state_dir, STATE_DIR};
use crate::types::CopyStats;
use crate::utils::{create_symlink, get_permissions, set_permissions};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Copy `src` into `dst`, skipping the internal state folder
///
/// `dst` may live inside `src` only below the state folder, which is how
/// branch snapshots are laid out.
///
/// # Errors
///
/// - [`IsyError::Copy`] on the first failing open, create, read, write or chmod
pub fn copy_tree(src: &Path, dst: &Path) -> Result<CopyStats> {
    info!("Copying {:?} to {:?}", src, dst);
    check_destination(src, dst)?;

    let mut stats = CopyStats::default();
    let mut dir_modes: Vec<(PathBuf, u32)> = Vec::new();

    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !(entry.file_type().is_dir() && is_state_dir(entry.file_name()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            let message = e.to_string();
            IsyError::Copy {
                path,
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message)),
            }
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| IsyError::internal(format!("{:?} is outside {:?}", entry.path(), src)))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(copy_err(&target))?;
            let metadata = entry.metadata().map_err(|e| IsyError::Copy {
                path: entry.path().to_path_buf(),
                source: e.into(),
            })?;
            dir_modes.push((target, get_permissions(&metadata)));
            stats.directories += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            stats.symlinks += 1;
        } else {
            stats.bytes += copy_file(entry.path(), &target)?;
            stats.files += 1;
        }
    }

    // Deepest directories first so a read-only parent never blocks a child
    for (dir, mode) in dir_modes.iter().rev() {
        set_permissions(dir, *mode).map_err(copy_err(dir))?;
    }

    debug!(
        "Copied {} files, {} directories, {} symlinks ({} bytes)",
        stats.files, stats.directories, stats.symlinks, stats.bytes
    );
    Ok(stats)
}

fn copy_file(src: &Path, target: &Path) -> Result<u64> {
    let mut reader = File::open(src).map_err(copy_err(src))?;
    let mode = get_permissions(&reader.metadata().map_err(copy_err(src))?);

    if fs::symlink_metadata(target).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(target).map_err(copy_err(target))?;
    }

    let mut writer = File::create(target).map_err(copy_err(target))?;
    let bytes = io::copy(&mut reader, &mut writer).map_err(copy_err(target))?;
    drop(writer);

    set_permissions(target, mode).map_err(copy_err(target))?;
    trace!("Copied {:?} ({} bytes)", src, bytes);
    Ok(bytes)
}

fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    let link_target = fs::read_link(src).map_err(copy_err(src))?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target).map_err(copy_err(target))?;
    }
    create_symlink(&link_target, target).map_err(copy_err(target))?;
    trace!("Recreated symlink {:?} -> {:?}", target, link_target);
    Ok(())
}

fn copy_err(path: &Path) -> impl FnOnce(io::Error) -> IsyError + '_ {
    move |source| IsyError::Copy {
        path: path.to_path_buf(),
        source,
    }
}

/// Reject destinations that would make the copy recurse into itself
fn check_destination(src: &Path, dst: &Path) -> Result<()> {
    let src_abs = src.canonicalize().map_err(copy_err(src))?;
    let dst_abs = resolve_nonexistent(dst).map_err(copy_err(dst))?;

    if let Ok(inside) = dst_abs.strip_prefix(&src_abs) {
        let first = inside.components().next();
        let under_state_dir = matches!(first, Some(Component::Normal(name)) if name == STATE_DIR);
        if !under_state_dir {
            return Err(IsyError::Copy {
                path: dst.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "destination lies inside the source tree",
                ),
            });
        }
    }
    Ok(())
}

/// Canonicalize the deepest existing ancestor and re-append the rest
fn resolve_nonexistent(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
