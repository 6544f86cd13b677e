//! System module: validated external command execution and host abstraction.

pub mod paths;
pub mod verification;

use crate::error::CommandError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Command;

static SERVICE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9@._\-]+$").expect("Invalid service name regex"));

/// Run an external command to completion, capturing stdout and stderr.
///
/// Every invoked tool is a blocking call; the pipeline never proceeds past a
/// command that has not finished. Nonzero exit is an error carrying the
/// captured stderr.
pub fn run_checked(cmd: &str, args: &[&str]) -> Result<String, CommandError> {
    run_checked_in(None, cmd, args)
}

/// Like [`run_checked`], with an optional working directory.
pub fn run_checked_in(
    dir: Option<&Path>,
    cmd: &str,
    args: &[&str],
) -> Result<String, CommandError> {
    let mut command = Command::new(cmd);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    log::info!("[System] Running: {} {}", cmd, args.join(" "));

    let output = command.output().map_err(|e| CommandError::SpawnFailed {
        cmd: cmd.to_string(),
        reason: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !stdout.is_empty() {
        log::info!("[{}] stdout: {}", cmd, stdout.trim_end());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if !stderr.is_empty() {
        log::info!("[{}] stderr: {}", cmd, stderr.trim_end());
    }

    if output.status.success() {
        Ok(stdout)
    } else {
        Err(CommandError::ExitFailure {
            cmd: format!("{} {}", cmd, args.join(" ")),
            code: output.status.code(),
            stderr: stderr.trim_end().to_string(),
        })
    }
}

/// Host server operations needed by the verify/reload step.
///
/// Abstracted behind a trait so the pipeline and rollback logic are testable
/// without a running nginx.
pub trait HostCommands {
    /// Check the host server is actually reachable (binary on PATH).
    fn preflight(&self) -> Result<(), crate::error::PreconditionError> {
        Ok(())
    }

    /// Run the server's configuration self-test (`nginx -t`).
    fn config_test(&self) -> Result<(), CommandError>;

    /// Reload the running server so it picks up the new configuration.
    fn reload(&self) -> Result<(), CommandError>;
}

/// Production implementation driving a real nginx host.
pub struct NginxHost {
    service: String,
}

impl NginxHost {
    /// Create a host wrapper for the given service name.
    ///
    /// The name is passed to systemctl as a bare argument, so it is validated
    /// against shell metacharacters up front.
    pub fn new(service: &str) -> Result<Self, CommandError> {
        if service.is_empty() || !SERVICE_NAME_REGEX.is_match(service) {
            return Err(CommandError::InvalidInput(format!(
                "Service name contains invalid characters: {}",
                service
            )));
        }
        Ok(NginxHost {
            service: service.to_string(),
        })
    }
}

impl HostCommands for NginxHost {
    fn preflight(&self) -> Result<(), crate::error::PreconditionError> {
        crate::system::paths::require_binary("nginx")
    }

    fn config_test(&self) -> Result<(), CommandError> {
        run_checked("nginx", &["-t"]).map(|_| ())
    }

    fn reload(&self) -> Result<(), CommandError> {
        // Prefer systemctl; fall back to signaling nginx directly on hosts
        // without systemd.
        if which::which("systemctl").is_ok() {
            run_checked("systemctl", &["reload", &self.service]).map(|_| ())
        } else {
            run_checked("nginx", &["-s", "reload"]).map(|_| ())
        }
    }
}
