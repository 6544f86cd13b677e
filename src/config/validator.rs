//! Settings validation.

use crate::config::Settings;
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;

// Service names are passed to systemctl as a bare argument and must never
// carry shell metacharacters.
static SERVICE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9@._\-]+$").expect("Invalid service name regex"));

/// Validate a settings struct before a run starts.
///
/// System paths written by the tool must be absolute so a run started from an
/// unexpected working directory cannot scribble on relative paths. The rules
/// directory is the one deliberate exception: it is resolved against the CWD,
/// matching the convention of invoking the tool from a rules checkout.
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if !settings.target_dir.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "target_dir must be an absolute path, got: {}",
            settings.target_dir.display()
        )));
    }

    if !settings.nginx_conf.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "nginx_conf must be an absolute path, got: {}",
            settings.nginx_conf.display()
        )));
    }

    if !settings.modules_dir.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "modules_dir must be an absolute path, got: {}",
            settings.modules_dir.display()
        )));
    }

    if settings.service.is_empty() || !SERVICE_NAME_REGEX.is_match(&settings.service) {
        return Err(ConfigError::ValidationFailed(format!(
            "Service name contains invalid characters: {}",
            settings.service
        )));
    }

    Ok(())
}
