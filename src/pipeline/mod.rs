//! Provisioning pipeline: an ordered list of typed steps executed with
//! fail-fast semantics and a recoverable rollback point.
//!
//! Execution is single-threaded and strictly sequential. The pipeline is the
//! sole mutator of the target directory during a run and implements no
//! locking; concurrent invocations are unsupported (run one at a time).

pub mod state;

pub use state::{PipelinePhase, PipelineState};

use crate::config::Settings;
use crate::deploy::{mirror, overwrite, snapshot};
use crate::error::Result;
use crate::models::{DeployMode, ReloadPolicy, StepReport, MANAGED_FILES};
use crate::system::verification::{self, VerifyOutcome};
use crate::system::{paths, HostCommands};
use std::path::PathBuf;

/// Typed step descriptors forming the pipeline. The order of the list is the
/// order of execution; no step runs once an earlier one has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Preflight,
    Snapshot,
    Deploy,
    VerifyReload,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Preflight => "preflight",
            Step::Snapshot => "snapshot",
            Step::Deploy => "deploy",
            Step::VerifyReload => "verify-reload",
        }
    }

    fn phase(&self) -> PipelinePhase {
        match self {
            Step::Preflight => PipelinePhase::Preflight,
            Step::Snapshot => PipelinePhase::Snapshot,
            Step::Deploy => PipelinePhase::Deploy,
            Step::VerifyReload => PipelinePhase::Verify,
        }
    }
}

/// Resolved inputs for a deploy run.
#[derive(Debug, Clone)]
pub struct Plan {
    pub target_dir: PathBuf,
    pub rules_dir: PathBuf,
    pub mode: DeployMode,
    pub reload_policy: ReloadPolicy,
}

impl Plan {
    /// Build a plan from settings, resolving the rules directory against the
    /// current working directory when it is relative.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let rules_dir = if settings.rules_dir.is_absolute() {
            settings.rules_dir.clone()
        } else {
            std::env::current_dir()?.join(&settings.rules_dir)
        };

        Ok(Plan {
            target_dir: settings.target_dir.clone(),
            rules_dir,
            mode: settings.deploy_mode,
            reload_policy: settings.reload_policy,
        })
    }

    /// The fixed step list for this plan.
    pub fn steps(&self) -> Vec<Step> {
        vec![
            Step::Preflight,
            Step::Snapshot,
            Step::Deploy,
            Step::VerifyReload,
        ]
    }
}

/// What a completed run produced.
#[derive(Debug)]
pub struct PipelineReport {
    /// Snapshot directory created for this run.
    pub snapshot: Option<PathBuf>,
    /// Per-file outcomes of the selective overwrite step.
    pub managed: Option<StepReport>,
    /// Files copied by the mirror step.
    pub mirrored: Option<u64>,
    pub verify: Option<VerifyOutcome>,
}

/// Sequential step runner with fail-fast semantics.
pub struct Pipeline<'a> {
    plan: Plan,
    host: &'a dyn HostCommands,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(plan: Plan, host: &'a dyn HostCommands) -> Self {
        Pipeline {
            plan,
            host,
            state: PipelineState::new(),
        }
    }

    /// Snapshot directory created so far, if any. Reported to the operator
    /// even when the run fails, so manual rollback stays possible.
    pub fn snapshot_path(&self) -> Option<&PathBuf> {
        self.state.snapshot_path.as_ref()
    }

    /// Execute the full step list. The first failing step stops the run.
    pub fn run(&mut self) -> Result<PipelineReport> {
        let steps = self.plan.steps();
        let total = steps.len();
        let mut report = PipelineReport {
            snapshot: None,
            managed: None,
            mirrored: None,
            verify: None,
        };

        for (index, step) in steps.iter().enumerate() {
            log::info!(
                "[Pipeline] Step {}/{}: {}",
                index + 1,
                total,
                step.as_str()
            );

            if self.state.phase != step.phase() {
                self.state.transition_to(step.phase())?;
            }

            if let Err(e) = self.execute(*step, &mut report) {
                self.state.fail(e.to_string());
                log::error!("[Pipeline] Step '{}' failed: {}", step.as_str(), e);
                if let Some(snap) = &self.state.snapshot_path {
                    log::error!(
                        "[Pipeline] Target can be restored manually from snapshot: {}",
                        snap.display()
                    );
                }
                return Err(e);
            }
        }

        self.state.transition_to(PipelinePhase::Completed)?;
        log::info!("[Pipeline] Run completed successfully");
        Ok(report)
    }

    fn execute(&mut self, step: Step, report: &mut PipelineReport) -> Result<()> {
        match step {
            Step::Preflight => self.preflight(),
            Step::Snapshot => {
                let snap = snapshot::create(&self.plan.target_dir)?;
                self.state.snapshot_path = Some(snap.clone());
                report.snapshot = Some(snap);
                Ok(())
            }
            Step::Deploy => match self.plan.mode {
                DeployMode::Selective => {
                    let managed = overwrite::apply_managed(
                        &self.plan.rules_dir,
                        &self.plan.target_dir,
                        MANAGED_FILES,
                    )?;
                    report.managed = Some(managed);
                    Ok(())
                }
                DeployMode::Mirror => {
                    let copied = mirror::sync_tree(&self.plan.rules_dir, &self.plan.target_dir)?;
                    report.mirrored = Some(copied);
                    Ok(())
                }
            },
            Step::VerifyReload => {
                // The snapshot step always precedes this one; a missing path
                // here is a pipeline bug, not an operator error.
                let snap = self
                    .state
                    .snapshot_path
                    .clone()
                    .ok_or("verify-reload reached without a snapshot")?;
                let outcome = verification::verify_and_reload(
                    self.host,
                    self.plan.reload_policy,
                    &self.plan.target_dir,
                    &snap,
                )?;
                report.verify = Some(outcome);
                Ok(())
            }
        }
    }

    /// Verify required paths and binaries before anything is mutated.
    fn preflight(&self) -> Result<()> {
        paths::require_dir(&self.plan.target_dir)?;
        paths::require_dir(&self.plan.rules_dir)?;
        if self.plan.reload_policy != ReloadPolicy::Skip {
            self.host.preflight()?;
        }
        log::info!("[Pipeline] Preflight checks passed");
        Ok(())
    }
}
