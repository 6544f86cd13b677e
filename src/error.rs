//! Unified error type hierarchy for modsec_provision
//!
//! Provides structured error handling with PreconditionError, SnapshotError,
//! PatchError, SyncError, CommandError, and ConfigError.

use std::io;
use thiserror::Error;

/// Precondition failures detected before any mutation is attempted.
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("Required directory missing: {0}")]
    MissingDirectory(String),

    #[error("Path exists but is not a directory: {0}")]
    NotADirectory(String),

    #[error("Required binary not found in PATH: {0}")]
    MissingBinary(String),

    #[error("Required file missing: {0}")]
    MissingFile(String),
}

/// Snapshot creation and restore errors.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot creation failed: {0}")]
    CreateFailed(String),

    #[error("Snapshot restore failed: {0}")]
    RestoreFailed(String),

    #[error("IO error during snapshot operation: {0}")]
    IoError(#[from] io::Error),
}

/// Structural text-patch errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch target file not found: {0}")]
    FileNotFound(String),

    #[error("Insertion anchor not found: {0}")]
    AnchorNotFound(String),

    #[error("Invalid regex pattern: {0}")]
    RegexInvalid(String),

    #[error("IO error during patch operation: {0}")]
    IoError(#[from] io::Error),
}

/// Selective-overwrite and mirror synchronization errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source directory missing: {0}")]
    SourceMissing(String),

    #[error("Failed to copy {src} -> {dst}: {reason}")]
    CopyFailed {
        src: String,
        dst: String,
        reason: String,
    },

    #[error("IO error during synchronization: {0}")]
    IoError(#[from] io::Error),
}

/// External command execution errors (package manager, toolchain, nginx).
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn '{cmd}': {reason}")]
    SpawnFailed { cmd: String, reason: String },

    #[error("Command '{cmd}' exited with status {code:?}: {stderr}")]
    ExitFailure {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid input for command execution: {0}")]
    InvalidInput(String),
}

/// Settings file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in settings: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Settings validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during settings operations: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level result type for operations that may fail.
/// Use this as the return type for all fallible orchestration functions.
/// Example: `fn risky_operation() -> Result<String>`
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_error_display() {
        let err = PreconditionError::MissingDirectory("/etc/nginx/modsec".to_string());
        assert_eq!(
            err.to_string(),
            "Required directory missing: /etc/nginx/modsec"
        );
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError::ExitFailure {
            cmd: "nginx -t".to_string(),
            code: Some(1),
            stderr: "unexpected end of file".to_string(),
        };
        assert!(err.to_string().contains("nginx -t"));
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_sync_error_copy_failed_display() {
        let err = SyncError::CopyFailed {
            src: "rules/crs-setup.conf".to_string(),
            dst: "/etc/nginx/modsec/crs-setup.conf".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("crs-setup.conf"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_result_type_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err("test error".into());
        assert!(result.is_err());
    }
}
