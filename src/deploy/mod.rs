//! Filesystem operations: snapshots, selective overwrite, mirror sync.

pub mod mirror;
pub mod overwrite;
pub mod snapshot;

use crate::error::SyncError;
use std::fs;
use std::path::Path;

/// Recursively copy `src` onto `dst`, creating directories as needed and
/// replacing files that already exist. Files present only under `dst` are
/// left in place, so the copy is a non-deleting mirror.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<u64, SyncError> {
    if !src.is_dir() {
        return Err(SyncError::SourceMissing(src.display().to_string()));
    }
    fs::create_dir_all(dst)?;

    let mut copied = 0u64;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copied += copy_tree(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).map_err(|e| SyncError::CopyFailed {
                src: src_path.display().to_string(),
                dst: dst_path.display().to_string(),
                reason: e.to_string(),
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}
