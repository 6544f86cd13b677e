//! Core data structures shared across the provisioning pipeline.

use serde::{Deserialize, Serialize};

/// Configuration files this tool is allowed to overwrite in selective mode.
///
/// Only names in this list are ever written into the target directory by the
/// selective overwrite step. Mirror mode bypasses the list and syncs the whole
/// rules tree instead.
pub const MANAGED_FILES: &[&str] = &[
    "modsecurity.conf",
    "crs-setup.conf",
    "unicode.mapping",
    "REQUEST-900-EXCLUSION-RULES-BEFORE-CRS.conf",
    "RESPONSE-999-EXCLUSION-RULES-AFTER-CRS.conf",
];

/// How local rules are written into the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Copy only the files in [`MANAGED_FILES`] that exist locally.
    Selective,
    /// Non-deleting mirror of the entire local rules tree onto the target.
    Mirror,
}

/// Whether the nginx config self-test gates the service reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Run the config self-test; reload on success, roll back to the snapshot
    /// and fail on test failure.
    Gated,
    /// Reload without running the self-test first. No automatic rollback.
    Force,
    /// Neither test nor reload. The operator handles service reload manually.
    Skip,
}

impl ReloadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadPolicy::Gated => "gated",
            ReloadPolicy::Force => "force",
            ReloadPolicy::Skip => "skip",
        }
    }
}

/// Outcome of a single file operation inside a deploy step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// File was copied (created or replaced).
    Applied,
    /// File was skipped, with a human-readable reason. Not an error.
    Skipped(String),
}

/// Per-file record produced by the overwrite and mirror steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// File name relative to the target directory.
    pub name: String,
    pub outcome: StepOutcome,
}

/// Aggregate result of a deploy step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepReport {
    pub files: Vec<FileReport>,
}

impl StepReport {
    pub fn applied_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == StepOutcome::Applied)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, StepOutcome::Skipped(_)))
            .count()
    }

    pub fn record_applied(&mut self, name: impl Into<String>) {
        self.files.push(FileReport {
            name: name.into(),
            outcome: StepOutcome::Applied,
        });
    }

    pub fn record_skipped(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.files.push(FileReport {
            name: name.into(),
            outcome: StepOutcome::Skipped(reason.into()),
        });
    }
}
