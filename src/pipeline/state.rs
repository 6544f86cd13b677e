//! Pipeline state tracking and phase transitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// Discrete phases of a provisioning run.
///
/// The runner moves through these strictly in order; the only branch is into
/// `Failed`, which ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// Precondition checks. Nothing has been mutated yet.
    Preflight,

    /// Timestamped backup of the target directory.
    Snapshot,

    /// Selective overwrite or mirror sync of the rules.
    Deploy,

    /// Config self-test and service reload per the reload policy.
    Verify,

    /// Run finished successfully.
    Completed,

    /// Run stopped on a failed step.
    Failed,
}

impl PipelinePhase {
    /// Human-readable phase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Preflight => "preflight",
            PipelinePhase::Snapshot => "snapshot",
            PipelinePhase::Deploy => "deploy",
            PipelinePhase::Verify => "verify",
            PipelinePhase::Completed => "completed",
            PipelinePhase::Failed => "failed",
        }
    }

    /// All valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<PipelinePhase> {
        match self {
            PipelinePhase::Preflight => vec![PipelinePhase::Snapshot, PipelinePhase::Failed],
            PipelinePhase::Snapshot => vec![PipelinePhase::Deploy, PipelinePhase::Failed],
            PipelinePhase::Deploy => vec![PipelinePhase::Verify, PipelinePhase::Failed],
            PipelinePhase::Verify => vec![PipelinePhase::Completed, PipelinePhase::Failed],
            PipelinePhase::Completed => vec![],
            PipelinePhase::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        self.valid_next_phases().contains(&next)
    }
}

/// Mutable state carried through a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub phase: PipelinePhase,

    /// Snapshot directory, set once the snapshot step succeeds. Reported on
    /// every failure so manual rollback stays possible.
    pub snapshot_path: Option<PathBuf>,

    pub start_time: SystemTime,

    pub last_update_time: SystemTime,

    /// Error message if the run failed.
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        let now = SystemTime::now();
        PipelineState {
            phase: PipelinePhase::Preflight,
            snapshot_path: None,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Transition to the next phase, validating legality first.
    pub fn transition_to(&mut self, next: PipelinePhase) -> Result<(), String> {
        if !self.phase.can_transition_to(next) {
            return Err(format!(
                "Invalid phase transition: {} -> {}",
                self.phase.as_str(),
                next.as_str()
            ));
        }
        self.phase = next;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Mark the run failed with a reason. Legal from any live phase.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.phase = PipelinePhase::Failed;
        self.error = Some(reason.into());
        self.last_update_time = SystemTime::now();
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions_are_legal() {
        let mut state = PipelineState::new();
        assert!(state.transition_to(PipelinePhase::Snapshot).is_ok());
        assert!(state.transition_to(PipelinePhase::Deploy).is_ok());
        assert!(state.transition_to(PipelinePhase::Verify).is_ok());
        assert!(state.transition_to(PipelinePhase::Completed).is_ok());
    }

    #[test]
    fn test_skipping_phases_is_illegal() {
        let mut state = PipelineState::new();
        assert!(state.transition_to(PipelinePhase::Verify).is_err());
        assert!(state.transition_to(PipelinePhase::Completed).is_err());
    }

    #[test]
    fn test_terminal_phases_have_no_exits() {
        assert!(PipelinePhase::Completed.valid_next_phases().is_empty());
        assert!(PipelinePhase::Failed.valid_next_phases().is_empty());
    }

    #[test]
    fn test_fail_records_reason_from_any_phase() {
        let mut state = PipelineState::new();
        state.transition_to(PipelinePhase::Snapshot).unwrap();
        state.fail("disk full");
        assert_eq!(state.phase, PipelinePhase::Failed);
        assert_eq!(state.error.as_deref(), Some("disk full"));
    }
}
