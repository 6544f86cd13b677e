//! Selective overwrite of the managed configuration files.

use crate::error::SyncError;
use crate::models::StepReport;
use std::fs;
use std::path::Path;

/// Copy each managed file that exists under `rules_dir` over the same name
/// under `target_dir`.
///
/// A managed name missing locally is a logged skip, not an error: the managed
/// list enumerates what the tool is allowed to write, not what must exist.
/// Files at the target that are not in the list are never touched.
pub fn apply_managed(
    rules_dir: &Path,
    target_dir: &Path,
    managed: &[&str],
) -> Result<StepReport, SyncError> {
    if !rules_dir.is_dir() {
        return Err(SyncError::SourceMissing(rules_dir.display().to_string()));
    }

    let mut report = StepReport::default();
    for name in managed {
        let src = rules_dir.join(name);
        if !src.is_file() {
            log::warn!("[Overwrite] Skipping {}: not present locally", name);
            report.record_skipped(*name, "not present locally");
            continue;
        }

        let dst = target_dir.join(name);
        fs::copy(&src, &dst).map_err(|e| SyncError::CopyFailed {
            src: src.display().to_string(),
            dst: dst.display().to_string(),
            reason: e.to_string(),
        })?;
        log::info!("[Overwrite] Updated {}", dst.display());
        report.record_applied(*name);
    }

    log::info!(
        "[Overwrite] Done: {} updated, {} skipped",
        report.applied_count(),
        report.skipped_count()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MANAGED_FILES;
    use tempfile::TempDir;

    #[test]
    fn test_partial_rules_dir_updates_only_present_files() {
        let temp = TempDir::new().unwrap();
        let rules = temp.path().join("rules");
        let target = temp.path().join("modsec");
        fs::create_dir_all(&rules).unwrap();
        fs::create_dir_all(&target).unwrap();

        // 3 of the 5 managed names exist locally.
        fs::write(rules.join("modsecurity.conf"), "new engine conf").unwrap();
        fs::write(rules.join("crs-setup.conf"), "new crs setup").unwrap();
        fs::write(rules.join("unicode.mapping"), "new mapping").unwrap();

        // Pre-existing target state for a file absent locally.
        fs::write(
            target.join("REQUEST-900-EXCLUSION-RULES-BEFORE-CRS.conf"),
            "untouched",
        )
        .unwrap();

        let report = apply_managed(&rules, &target, MANAGED_FILES).unwrap();
        assert_eq!(report.applied_count(), 3);
        assert_eq!(report.skipped_count(), 2);

        assert_eq!(
            fs::read_to_string(target.join("modsecurity.conf")).unwrap(),
            "new engine conf"
        );
        assert_eq!(
            fs::read_to_string(target.join("REQUEST-900-EXCLUSION-RULES-BEFORE-CRS.conf"))
                .unwrap(),
            "untouched"
        );
    }

    #[test]
    fn test_unmanaged_target_files_never_touched() {
        let temp = TempDir::new().unwrap();
        let rules = temp.path().join("rules");
        let target = temp.path().join("modsec");
        fs::create_dir_all(&rules).unwrap();
        fs::create_dir_all(&target).unwrap();

        // Present locally but not in the managed list: must not be copied.
        fs::write(rules.join("rogue.conf"), "nope").unwrap();
        fs::write(rules.join("modsecurity.conf"), "ok").unwrap();

        apply_managed(&rules, &target, MANAGED_FILES).unwrap();
        assert!(!target.join("rogue.conf").exists());
        assert!(target.join("modsecurity.conf").exists());
    }

    #[test]
    fn test_missing_rules_dir_is_an_error() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("modsec");
        fs::create_dir_all(&target).unwrap();

        let result = apply_managed(&temp.path().join("missing"), &target, MANAGED_FILES);
        assert!(matches!(result, Err(SyncError::SourceMissing(_))));
    }

    #[test]
    fn test_replaces_existing_target_file() {
        let temp = TempDir::new().unwrap();
        let rules = temp.path().join("rules");
        let target = temp.path().join("modsec");
        fs::create_dir_all(&rules).unwrap();
        fs::create_dir_all(&target).unwrap();

        fs::write(rules.join("crs-setup.conf"), "v2").unwrap();
        fs::write(target.join("crs-setup.conf"), "v1").unwrap();

        apply_managed(&rules, &target, MANAGED_FILES).unwrap();
        assert_eq!(
            fs::read_to_string(target.join("crs-setup.conf")).unwrap(),
            "v2"
        );
    }
}
