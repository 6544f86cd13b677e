//! Settings management for provisioning runs.

pub mod loader;
pub mod validator;

use crate::models::{DeployMode, ReloadPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime settings controlling a provisioning run.
///
/// Every field has a default matching the conventional nginx/ModSecurity
/// layout, so the tool works with no settings file at all. A JSON settings
/// file and CLI flags can override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// WAF config directory that deploys write into.
    pub target_dir: PathBuf,

    /// Local rules directory deploys read from (resolved against the CWD
    /// when relative).
    pub rules_dir: PathBuf,

    /// Main nginx configuration file patched during install.
    pub nginx_conf: PathBuf,

    /// Directory the compiled connector module is installed into.
    pub modules_dir: PathBuf,

    /// nginx source tree used to build the dynamic connector module.
    pub nginx_src_dir: PathBuf,

    /// Scratch directory where engine and connector sources are cloned.
    pub build_dir: PathBuf,

    pub deploy_mode: DeployMode,

    pub reload_policy: ReloadPolicy,

    /// Service name passed to systemctl for reloads.
    pub service: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            target_dir: PathBuf::from("/etc/nginx/modsec"),
            rules_dir: PathBuf::from("rules"),
            nginx_conf: PathBuf::from("/etc/nginx/nginx.conf"),
            modules_dir: PathBuf::from("/etc/nginx/modules"),
            nginx_src_dir: PathBuf::from("nginx-src"),
            build_dir: PathBuf::from("build"),
            deploy_mode: DeployMode::Selective,
            reload_policy: ReloadPolicy::Gated,
            service: "nginx".to_string(),
        }
    }
}
