//! Timestamped snapshots of the target directory for rollback.

use crate::deploy::copy_tree;
use crate::error::SnapshotError;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp format used in snapshot directory names. Sortable, second
/// resolution, so the newest snapshot is always the lexicographic maximum.
const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Build the snapshot path for `target`: a sibling directory named
/// `<target>.bak-<timestamp>`.
pub fn snapshot_path_for(target: &Path) -> PathBuf {
    let timestamp = Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT);
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "target".to_string());
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.bak-{}", name, timestamp))
}

/// Create a full snapshot of `target` before any mutation.
///
/// Returns the snapshot path. Snapshots are never deleted by this tool;
/// pruning is left to the operator.
pub fn create(target: &Path) -> Result<PathBuf, SnapshotError> {
    if !target.is_dir() {
        return Err(SnapshotError::CreateFailed(format!(
            "target directory missing: {}",
            target.display()
        )));
    }

    // Runs within the same wall-clock second would collide on the timestamp;
    // a numeric suffix keeps every run's snapshot distinct.
    let base = snapshot_path_for(target);
    let mut snapshot = base.clone();
    let mut attempt = 1u32;
    while snapshot.exists() {
        snapshot = PathBuf::from(format!("{}-{}", base.display(), attempt));
        attempt += 1;
    }

    copy_tree(target, &snapshot)
        .map_err(|e| SnapshotError::CreateFailed(format!("{}", e)))?;

    log::info!(
        "[Snapshot] Created {} from {}",
        snapshot.display(),
        target.display()
    );
    Ok(snapshot)
}

/// Restore `target` from `snapshot`, discarding everything the run wrote.
///
/// The target is removed and recreated from the snapshot rather than merged,
/// so files introduced after the snapshot do not survive the rollback and the
/// restored tree is byte-identical to the snapshot.
pub fn restore(snapshot: &Path, target: &Path) -> Result<(), SnapshotError> {
    if !snapshot.is_dir() {
        return Err(SnapshotError::RestoreFailed(format!(
            "snapshot directory missing: {}",
            snapshot.display()
        )));
    }

    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    copy_tree(snapshot, target)
        .map_err(|e| SnapshotError::RestoreFailed(format!("{}", e)))?;

    log::warn!(
        "[Snapshot] Restored {} from {}",
        target.display(),
        snapshot.display()
    );
    Ok(())
}
