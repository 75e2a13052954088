//! Temp-file-then-rename JSON persistence shared by the file stores.

use crate::domain::SyncError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temp file used while replacing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

/// Write `value` as pretty JSON to `path`, atomically.
///
/// The bytes go to a sibling temp file that is synced and then renamed over
/// `path`. A crash at any point leaves either the old or the new file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SyncError> {
    let staged = stage_json(path, value)?;
    commit_staged(&staged, path)
}

/// Write `value` to the temp file for `path` and sync it, without touching
/// `path` itself. Returns the temp file; a failed stage leaves none behind.
pub fn stage_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf, SyncError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::persistence(parent, e))?;
    }

    let bytes = serde_json::to_vec_pretty(value).map_err(|e| SyncError::persistence(path, e))?;

    let temp = temp_path(path);
    let result = File::create(&temp).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(e) = result {
        discard_staged(&temp);
        return Err(SyncError::persistence(&temp, e));
    }

    Ok(temp)
}

/// Rename a staged temp file over `path`.
pub fn commit_staged(staged: &Path, path: &Path) -> Result<(), SyncError> {
    fs::rename(staged, path).map_err(|e| SyncError::persistence(path, e))?;
    sync_parent_dir(path);
    Ok(())
}

/// Remove a staged temp file that will not be committed.
pub fn discard_staged(staged: &Path) {
    if let Err(e) = fs::remove_file(staged) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("[sync] Could not remove {}: {}", staged.display(), e);
        }
    }
}

/// Read JSON from `path`; `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SyncError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SyncError::persistence(path, e)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| SyncError::persistence(path, e))
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            if let Err(e) = dir.sync_all() {
                tracing::debug!("[sync] Directory sync of {} failed: {}", parent.display(), e);
            }
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
