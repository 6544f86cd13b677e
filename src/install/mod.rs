//! Initial install workflow: packages, sources, compilation, module
//! deployment, and idempotent nginx.conf patching.
//!
//! Repeating a finished install is safe: clones are reused, config seeds are
//! create-if-absent, and every nginx.conf insertion is marker-guarded.

pub mod build;
pub mod packages;
pub mod sources;

use crate::config::Settings;
use crate::deploy::{mirror, snapshot};
use crate::error::Result;
use crate::patch;
use crate::system::paths::{self, MAIN_CONF_NAME, MODULE_FILE_NAME};
use crate::system::verification;
use crate::system::HostCommands;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Runs the full install sequence against a host.
pub struct Installer<'a> {
    settings: &'a Settings,
    host: &'a dyn HostCommands,
}

impl<'a> Installer<'a> {
    pub fn new(settings: &'a Settings, host: &'a dyn HostCommands) -> Self {
        Installer { settings, host }
    }

    /// Execute the install pipeline. Fail-fast: the first failing stage stops
    /// the run. Only the final verify stage carries automatic rollback; all
    /// earlier failures leave the reported backups for manual recovery.
    pub fn run(&self) -> Result<()> {
        self.preflight()?;

        let pm = packages::PackageManager::detect()?;
        packages::install_build_deps(pm)?;

        // The toolchain comes from the package step above, so it is checked
        // only now. A fresh host without a compiler must get past preflight.
        paths::require_binary("make")?;
        paths::require_binary("gcc")?;

        let fetched = sources::fetch_all(&self.settings.build_dir)?;
        build::build_engine(&fetched.engine_dir)?;
        let module = build::build_connector_module(
            &self.settings.nginx_src_dir,
            &fetched.connector_dir,
        )?;

        self.install_module(&module)?;

        // Everything below mutates live nginx configuration. Take the backups
        // first so the verify stage has a rollback point.
        let conf_backup = self.backup_nginx_conf()?;
        fs::create_dir_all(&self.settings.target_dir)?;
        let target_snapshot = snapshot::create(&self.settings.target_dir)?;

        self.seed_target_config(&fetched)?;
        self.patch_nginx_conf()?;

        match verification::verify_and_reload(
            self.host,
            self.settings.reload_policy,
            &self.settings.target_dir,
            &target_snapshot,
        ) {
            Ok(outcome) => {
                log::info!("[Install] Install finished ({:?})", outcome);
                log::info!(
                    "[Install] Backups kept: {} and {}",
                    conf_backup.display(),
                    target_snapshot.display()
                );
                Ok(())
            }
            Err(e) => {
                // Under the gated policy a failed self-test already restored
                // the target directory; under force a failed reload leaves it
                // mutated. Either way nginx.conf carries the patches and gets
                // its backup restored, and the target snapshot is reported so
                // manual rollback stays possible.
                if let Err(restore_err) = self.restore_conf_backup(&conf_backup) {
                    log::error!(
                        "[Install] nginx.conf restore failed: {}; backup kept at {}",
                        restore_err,
                        conf_backup.display()
                    );
                }
                log::error!(
                    "[Install] Target snapshot kept at {}",
                    target_snapshot.display()
                );
                Err(e)
            }
        }
    }

    /// True preconditions only: the host server and the inputs no package
    /// install can provide. Build tools are deliberately not checked here;
    /// the package step is what puts them on a fresh host.
    fn preflight(&self) -> Result<()> {
        self.host.preflight()?;
        paths::require_file(&self.settings.nginx_conf)?;
        paths::require_dir(&self.settings.nginx_src_dir)?;
        paths::require_file(&self.settings.nginx_src_dir.join("configure"))?;
        log::info!("[Install] Preflight checks passed");
        Ok(())
    }

    /// Put nginx.conf back the way the backup recorded it.
    fn restore_conf_backup(&self, conf_backup: &Path) -> Result<()> {
        log::warn!(
            "[Install] Restoring {} from {}",
            self.settings.nginx_conf.display(),
            conf_backup.display()
        );
        fs::copy(conf_backup, &self.settings.nginx_conf)?;
        Ok(())
    }

    /// Copy the compiled module into the nginx modules directory.
    fn install_module(&self, module: &Path) -> Result<()> {
        paths::require_file(module)?;
        fs::create_dir_all(&self.settings.modules_dir)?;
        let dest = self.settings.modules_dir.join(MODULE_FILE_NAME);
        fs::copy(module, &dest)?;
        log::info!("[Install] Module installed at {}", dest.display());
        Ok(())
    }

    /// Back up nginx.conf to a timestamped sibling before patching it.
    fn backup_nginx_conf(&self) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let backup = self
            .settings
            .nginx_conf
            .with_extension(format!("conf.bak-{}", timestamp));
        fs::copy(&self.settings.nginx_conf, &backup)?;
        log::info!("[Install] Backed up nginx.conf to {}", backup.display());
        Ok(backup)
    }

    /// Seed the target directory with engine and CRS configuration.
    ///
    /// Seeds are create-if-absent so a re-run never clobbers operator edits;
    /// the engine toggle and the main.conf assembly converge instead.
    fn seed_target_config(&self, fetched: &sources::FetchedSources) -> Result<()> {
        let target = &self.settings.target_dir;

        copy_if_absent(
            &fetched.engine_dir.join("modsecurity.conf-recommended"),
            &target.join("modsecurity.conf"),
        )?;
        copy_if_absent(
            &fetched.engine_dir.join("unicode.mapping"),
            &target.join("unicode.mapping"),
        )?;
        copy_if_absent(
            &fetched.crs_dir.join("crs-setup.conf.example"),
            &target.join("crs-setup.conf"),
        )?;
        mirror::sync_tree(&fetched.crs_dir.join("rules"), &target.join("rules"))?;

        patch::set_rule_engine_on(&target.join("modsecurity.conf"))?;

        fs::write(
            target.join(MAIN_CONF_NAME),
            build::main_conf_content(target),
        )?;
        log::info!("[Install] Target config seeded at {}", target.display());
        Ok(())
    }

    /// Apply the marker-guarded nginx.conf insertions.
    fn patch_nginx_conf(&self) -> Result<()> {
        let conf = &self.settings.nginx_conf;

        patch::load_module_directive(MODULE_FILE_NAME).apply(conf)?;
        let rules_file = self.settings.target_dir.join(MAIN_CONF_NAME);
        for directive in patch::http_enable_directives(&rules_file) {
            directive.apply(conf)?;
        }
        Ok(())
    }
}

/// Copy `src` to `dst` only when `dst` does not exist yet.
fn copy_if_absent(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        log::info!("[Install] Keeping existing {}", dst.display());
        return Ok(());
    }
    if !src.is_file() {
        return Err(format!("Seed file missing: {}", src.display()).into());
    }
    fs::copy(src, dst)?;
    log::info!("[Install] Seeded {}", dst.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;
    use tempfile::TempDir;

    struct IdleHost;

    impl HostCommands for IdleHost {
        fn config_test(&self) -> std::result::Result<(), CommandError> {
            Ok(())
        }

        fn reload(&self) -> std::result::Result<(), CommandError> {
            Ok(())
        }
    }

    fn settings_with_fixture(root: &Path) -> Settings {
        let nginx_conf = root.join("nginx.conf");
        let src_dir = root.join("nginx-src");
        fs::write(&nginx_conf, "events {}\nhttp {}\n").unwrap();
        fs::create_dir_all(&src_dir).unwrap();
        fs::write(src_dir.join("configure"), "#!/bin/sh\n").unwrap();

        let mut settings = Settings::default();
        settings.nginx_conf = nginx_conf;
        settings.nginx_src_dir = src_dir;
        settings
    }

    #[test]
    fn test_preflight_needs_no_build_toolchain() {
        // A fresh host has nginx and its sources but no compiler yet; the
        // package step later provides make and gcc, so preflight must pass
        // without them.
        let temp = TempDir::new().unwrap();
        let settings = settings_with_fixture(temp.path());
        let installer = Installer::new(&settings, &IdleHost);
        assert!(installer.preflight().is_ok());
    }

    #[test]
    fn test_preflight_missing_configure_script_is_fatal() {
        let temp = TempDir::new().unwrap();
        let settings = settings_with_fixture(temp.path());
        fs::remove_file(settings.nginx_src_dir.join("configure")).unwrap();

        let installer = Installer::new(&settings, &IdleHost);
        assert!(installer.preflight().is_err());
    }

    #[test]
    fn test_restore_conf_backup_reverts_patched_conf() {
        let temp = TempDir::new().unwrap();
        let settings = settings_with_fixture(temp.path());
        let backup = temp.path().join("nginx.conf.bak-20260830-120000");
        fs::copy(&settings.nginx_conf, &backup).unwrap();
        fs::write(&settings.nginx_conf, "load_module broken;\nevents {}\n").unwrap();

        let installer = Installer::new(&settings, &IdleHost);
        installer.restore_conf_backup(&backup).unwrap();
        assert_eq!(
            fs::read_to_string(&settings.nginx_conf).unwrap(),
            "events {}\nhttp {}\n"
        );
    }

    #[test]
    fn test_copy_if_absent_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("seed.conf");
        let dst = temp.path().join("live.conf");
        fs::write(&src, "seed").unwrap();
        fs::write(&dst, "operator edited").unwrap();

        copy_if_absent(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "operator edited");
    }

    #[test]
    fn test_copy_if_absent_seeds_missing_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("seed.conf");
        let dst = temp.path().join("live.conf");
        fs::write(&src, "seed").unwrap();

        copy_if_absent(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "seed");
    }

    #[test]
    fn test_copy_if_absent_missing_seed_is_error() {
        let temp = TempDir::new().unwrap();
        let result = copy_if_absent(
            &temp.path().join("missing.conf"),
            &temp.path().join("live.conf"),
        );
        assert!(result.is_err());
    }
}
