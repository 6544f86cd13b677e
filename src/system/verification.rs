//! Post-mutation verification and reload, with automatic rollback.
//!
//! Transaction-like wrapper around the mutation steps: snapshot was taken
//! before mutation; this step decides between commit (reload) and rollback
//! (restore the snapshot) based on the host's own config self-test.

use crate::deploy::snapshot;
use crate::error::Result;
use crate::models::ReloadPolicy;
use crate::system::HostCommands;
use std::path::Path;

/// What the verify/reload step ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Self-test passed and the service was reloaded.
    Committed,
    /// Reloaded without running the self-test (`ReloadPolicy::Force`).
    ReloadedUnverified,
    /// Neither tested nor reloaded (`ReloadPolicy::Skip`).
    SkippedByPolicy,
}

/// Run the configured verify/reload behavior after mutation.
///
/// Under `Gated`, a failing self-test restores `target` from `snapshot_dir`
/// before the error propagates, leaving the target byte-identical to its
/// pre-run state. Under `Force` and `Skip` no automatic rollback exists and
/// the operator falls back to the reported snapshot path.
pub fn verify_and_reload(
    host: &dyn HostCommands,
    policy: ReloadPolicy,
    target: &Path,
    snapshot_dir: &Path,
) -> Result<VerifyOutcome> {
    match policy {
        ReloadPolicy::Skip => {
            log::info!("[Verify] Reload policy is 'skip': leaving service untouched");
            Ok(VerifyOutcome::SkippedByPolicy)
        }
        ReloadPolicy::Force => {
            log::warn!("[Verify] Reload policy is 'force': reloading without config self-test");
            host.reload()?;
            log::info!("[Verify] Service reloaded");
            Ok(VerifyOutcome::ReloadedUnverified)
        }
        ReloadPolicy::Gated => {
            log::info!("[Verify] Running config self-test");
            match host.config_test() {
                Ok(()) => {
                    log::info!("[Verify] Self-test passed, reloading service");
                    host.reload()?;
                    log::info!("[Verify] Service reloaded");
                    Ok(VerifyOutcome::Committed)
                }
                Err(test_err) => {
                    log::error!("[Verify] Self-test failed: {}", test_err);
                    log::warn!(
                        "[Verify] Rolling back {} from snapshot {}",
                        target.display(),
                        snapshot_dir.display()
                    );
                    snapshot::restore(snapshot_dir, target)?;
                    Err(Box::new(test_err))
                }
            }
        }
    }
}
