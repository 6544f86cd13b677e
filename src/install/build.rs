//! Compilation of the engine and the dynamic connector module.

use crate::error::CommandError;
use crate::system::paths::MODULE_FILE_NAME;
use crate::system::run_checked_in;
use std::path::{Path, PathBuf};

/// Build and install the ModSecurity engine from its source checkout.
///
/// Runs the upstream sequence: `build.sh`, `configure`, `make`,
/// `make install`. Each command must finish successfully before the next
/// starts; any nonzero exit aborts the install.
pub fn build_engine(engine_dir: &Path) -> Result<(), CommandError> {
    log::info!("[Build] Building ModSecurity engine in {}", engine_dir.display());

    run_checked_in(Some(engine_dir), "sh", &["build.sh"])?;

    let configure = engine_dir.join("configure");
    run_checked_in(Some(engine_dir), &configure.to_string_lossy(), &[])?;

    run_checked_in(Some(engine_dir), "make", &[])?;
    run_checked_in(Some(engine_dir), "make", &["install"])?;

    log::info!("[Build] Engine build finished");
    Ok(())
}

/// Build the dynamic connector module against the host's nginx source tree.
///
/// Uses `--with-compat` so the module built from the matching source version
/// loads into the distribution binary. Returns the path of the produced
/// module object.
pub fn build_connector_module(
    nginx_src_dir: &Path,
    connector_dir: &Path,
) -> Result<PathBuf, CommandError> {
    log::info!(
        "[Build] Building connector module against nginx sources in {}",
        nginx_src_dir.display()
    );

    let add_module = format!("--add-dynamic-module={}", connector_dir.display());
    let configure = nginx_src_dir.join("configure");
    run_checked_in(
        Some(nginx_src_dir),
        &configure.to_string_lossy(),
        &["--with-compat", &add_module],
    )?;
    run_checked_in(Some(nginx_src_dir), "make", &["modules"])?;

    let module = nginx_src_dir.join("objs").join(MODULE_FILE_NAME);
    log::info!("[Build] Connector module produced at {}", module.display());
    Ok(module)
}

/// Content of the top-level rules file included from nginx.conf.
///
/// Chains the engine config, the CRS setup, and every CRS rule file under
/// the target directory.
pub fn main_conf_content(target_dir: &Path) -> String {
    format!(
        "# Assembled by modsec_provision. Edit the included files, not this one.\n\
         Include {target}/modsecurity.conf\n\
         Include {target}/crs-setup.conf\n\
         Include {target}/rules/*.conf\n",
        target = target_dir.display()
    )
}
