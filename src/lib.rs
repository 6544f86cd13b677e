//! modsec_provision
//!
//! Provisioning orchestrator for the ModSecurity v3 WAF on nginx hosts. The
//! crate installs the engine and connector module, deploys rule configuration
//! from a local directory, and patches nginx configuration idempotently, all
//! as an ordered fail-fast pipeline with a snapshot-based rollback point.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and the managed-file list
//! - **config**: Settings loading and validation
//! - **pipeline**: Sequential step runner with fail-fast semantics
//! - **deploy**: Snapshots, selective overwrite, mirror sync
//! - **patch**: Idempotent structural text patching
//! - **system**: Validated command execution, verify/reload, path checks
//! - **install**: Package, source, and build workflow for the initial install

pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod install;
pub mod models;
pub mod patch;
pub mod pipeline;
pub mod system;

// Robust, decoupled logging system
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// Re-export error types for easy access
pub use error::{
    CommandError, ConfigError, PatchError, PreconditionError, Result, SnapshotError, SyncError,
};

// Re-export model types for easy access
pub use models::{DeployMode, ReloadPolicy, StepOutcome, StepReport, MANAGED_FILES};

pub use config::Settings;
pub use pipeline::{Pipeline, PipelinePhase, PipelineState, Plan};
pub use system::{HostCommands, NginxHost};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
