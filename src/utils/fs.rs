//! Filesystem helpers for the launcher.
//!
//! All mutating helpers here are written with Windows in mind: files of a
//! recently-terminated process can stay locked for a short window, so
//! deletions and renames retry a bounded number of times before failing.
//!
//! # Guarantees
//!
//! - [`atomic_write`] never leaves a partially-written file at the target
//!   path
//! - [`copy_dir_contents`] preserves the directory structure and skips
//!   nothing silently except the entries the caller excludes by name
//! - retry helpers fail with the underlying error after the last attempt,
//!   never with a generic message

use crate::constants::{FILE_OP_ATTEMPTS, FILE_OP_RETRY_DELAY};
use crate::core::Result;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Create a directory and all of its parents if they do not exist.
///
/// # Errors
///
/// Returns an error if the path exists but is not a directory, or if
/// creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if path.is_dir() {
            return Ok(());
        }
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("path exists but is not a directory: {}", path.display()),
        )
        .into());
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Write a file atomically via a temporary file in the same directory.
///
/// The content is fully written and synced before the temp file is renamed
/// over the target, so readers never observe a partial file.
///
/// # Errors
///
/// Returns an error if the temp file cannot be created, written, or
/// renamed into place.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Delete a file, retrying if it is transiently locked.
///
/// Missing files are not an error.
///
/// # Errors
///
/// Returns the last I/O error if the file still cannot be removed after
/// all attempts.
pub async fn remove_file_with_retry(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut last_err = None;
    for attempt in 1..=FILE_OP_ATTEMPTS {
        match fs::remove_file(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::debug!(
                    "Attempt {attempt}/{FILE_OP_ATTEMPTS} to remove {} failed: {e}",
                    path.display()
                );
                last_err = Some(e);
                if attempt < FILE_OP_ATTEMPTS {
                    tokio::time::sleep(FILE_OP_RETRY_DELAY).await;
                }
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| std::io::Error::other("file removal failed"))
        .into())
}

/// Delete a directory tree, retrying if entries are transiently locked.
///
/// Missing directories are not an error.
///
/// # Errors
///
/// Returns the last I/O error if the directory still cannot be removed
/// after all attempts.
pub async fn remove_dir_all_with_retry(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut last_err = None;
    for attempt in 1..=FILE_OP_ATTEMPTS {
        match fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::debug!(
                    "Attempt {attempt}/{FILE_OP_ATTEMPTS} to remove {} failed: {e}",
                    path.display()
                );
                last_err = Some(e);
                if attempt < FILE_OP_ATTEMPTS {
                    tokio::time::sleep(FILE_OP_RETRY_DELAY).await;
                }
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| std::io::Error::other("directory removal failed"))
        .into())
}

/// Rename a file or directory, retrying if the source is transiently locked.
///
/// # Errors
///
/// Returns the last I/O error if the rename still fails after all attempts.
pub async fn rename_with_retry(from: &Path, to: &Path) -> Result<()> {
    let mut last_err = None;
    for attempt in 1..=FILE_OP_ATTEMPTS {
        match fs::rename(from, to) {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!(
                    "Attempt {attempt}/{FILE_OP_ATTEMPTS} to rename {} -> {} failed: {e}",
                    from.display(),
                    to.display()
                );
                last_err = Some(e);
                if attempt < FILE_OP_ATTEMPTS {
                    tokio::time::sleep(FILE_OP_RETRY_DELAY).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("rename failed")).into())
}

/// Recursively copy the *contents* of `src` into `dst`, skipping any
/// top-level entry whose name appears in `exclude`.
///
/// `dst` is created if missing. Exclusion applies at the top level only,
/// which is all the snapshot logic needs (the backup directory lives
/// directly inside the installed tree).
///
/// # Errors
///
/// Returns an error naming the offending entry if any copy fails.
pub fn copy_dir_contents(src: &Path, dst: &Path, exclude: &[&str]) -> Result<()> {
    ensure_dir(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if exclude.iter().any(|ex| name == std::ffi::OsStr::new(ex)) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);

        if entry.file_type()?.is_dir() {
            copy_dir_tree(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

fn copy_dir_tree(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_tree(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Remove a directory only if it is empty. Non-empty or missing
/// directories are left alone.
pub fn remove_dir_if_empty(path: &Path) {
    if let Err(e) = fs::remove_dir(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("Leaving {} in place: {e}", path.display());
        }
    }
}
