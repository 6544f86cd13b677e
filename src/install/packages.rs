//! Build-dependency installation through the system package manager.

use crate::error::{CommandError, PreconditionError};
use crate::system::run_checked;
use once_cell::sync::Lazy;
use regex::Regex;

// Package names are passed as bare arguments; reject anything that could be
// interpreted by a shell or as an option.
static PACKAGE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.+_\-]+$").expect("Invalid package name regex"));

/// Build dependencies for the engine and connector on Debian-family hosts.
pub const BUILD_DEPS_APT: &[&str] = &[
    "gcc",
    "g++",
    "make",
    "automake",
    "autoconf",
    "libtool",
    "pkg-config",
    "git",
    "libpcre2-dev",
    "libxml2-dev",
    "libcurl4-openssl-dev",
    "libssl-dev",
    "libyajl-dev",
    "liblua5.3-dev",
    "libgeoip-dev",
    "zlib1g-dev",
];

/// Build dependencies on RPM-family hosts.
pub const BUILD_DEPS_DNF: &[&str] = &[
    "gcc",
    "gcc-c++",
    "make",
    "automake",
    "autoconf",
    "libtool",
    "pkgconf-pkg-config",
    "git",
    "pcre2-devel",
    "libxml2-devel",
    "libcurl-devel",
    "openssl-devel",
    "yajl-devel",
    "lua-devel",
    "GeoIP-devel",
    "zlib-devel",
];

/// Supported system package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
}

impl PackageManager {
    /// Detect the host's package manager from PATH.
    pub fn detect() -> Result<Self, PreconditionError> {
        if which::which("apt-get").is_ok() {
            return Ok(PackageManager::Apt);
        }
        if which::which("dnf").is_ok() {
            return Ok(PackageManager::Dnf);
        }
        Err(PreconditionError::MissingBinary(
            "apt-get or dnf".to_string(),
        ))
    }

    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
        }
    }

    pub fn build_deps(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Apt => BUILD_DEPS_APT,
            PackageManager::Dnf => BUILD_DEPS_DNF,
        }
    }

    /// Argument vector for a non-interactive install of `packages`.
    pub fn install_args<'a>(&self, packages: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec!["install", "-y"];
        args.extend_from_slice(packages);
        args
    }
}

/// Validate a package name before it reaches the command line.
pub fn validate_package_name(name: &str) -> Result<(), CommandError> {
    if !PACKAGE_NAME_REGEX.is_match(name) {
        return Err(CommandError::InvalidInput(format!(
            "Package name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Install the build-dependency set for the detected package manager.
/// Nonzero exit from the package manager is fatal.
pub fn install_build_deps(pm: PackageManager) -> Result<(), CommandError> {
    let deps = pm.build_deps();
    for name in deps {
        validate_package_name(name)?;
    }

    log::info!(
        "[Packages] Installing {} build dependencies via {}",
        deps.len(),
        pm.binary()
    );
    run_checked(pm.binary(), &pm.install_args(deps)).map(|_| ())
}
