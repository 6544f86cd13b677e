//! Full synchronization: non-deleting mirror of the rules tree.

use crate::deploy::copy_tree;
use crate::error::SyncError;
use std::path::Path;

/// Mirror the entire local rules tree onto the target directory.
///
/// Every file and subdirectory present locally ends up present and current at
/// the target. Files present only at the target are left untouched; this is
/// deliberately not a deleting sync, so operator-local additions survive.
pub fn sync_tree(rules_dir: &Path, target_dir: &Path) -> Result<u64, SyncError> {
    let copied = copy_tree(rules_dir, target_dir)?;
    log::info!(
        "[Mirror] Synced {} file(s) from {} to {}",
        copied,
        rules_dir.display(),
        target_dir.display()
    );
    Ok(copied)
}
