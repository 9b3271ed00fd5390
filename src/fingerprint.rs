//! Content fingerprints of directory trees
//!
//! A fingerprint is the SHA-256 of the bytes of every regular file below a
//! directory, fed in file-name order, with the internal state folder skipped.
//! Nothing else goes into the digest: no names, no separators, no metadata.
//!
//! Two consequences follow and are relied upon:
//!
//! - a snapshot copied with [`crate::copy::copy_tree`] has the same
//!   fingerprint as its source, wherever it lives;
//! - renaming files does not change the fingerprint as long as the byte
//!   stream and the traversal order stay the same.

use crate::error::{IsyError, Result};
use crate::paths::is_state_dir;
use crate::utils::stream_into;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Compute the fingerprint of `dir` as a 64-character lowercase hex string
///
/// # Errors
///
/// - [`IsyError::DirectoryUnreadable`] if `dir` or any entry below it cannot
///   be listed or opened
pub fn fingerprint(dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut files = 0usize;
    let mut bytes = 0u64;

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !(entry.file_type().is_dir() && is_state_dir(entry.file_name()))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            IsyError::DirectoryUnreadable {
                path,
                source: walk_error_to_io(e),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        bytes += stream_into(&mut hasher, entry.path()).map_err(|source| {
            IsyError::DirectoryUnreadable {
                path: entry.path().to_path_buf(),
                source,
            }
        })?;
        files += 1;
        trace!("Fingerprinted {:?}", entry.path());
    }

    let digest = hex::encode(hasher.finalize());
    debug!(
        "Fingerprint of {:?}: {} ({} files, {} bytes)",
        dir, digest, files, bytes
    );
    Ok(digest)
}

fn walk_error_to_io(err: walkdir::Error) -> io::Error {
    let message = err.to_string();
    err.into_io_error()
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message))
}
