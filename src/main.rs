use log::LevelFilter;

use modsec_provision::cli::{parse_cli, Commands};
use modsec_provision::config::{loader, validator};
use modsec_provision::install::Installer;
use modsec_provision::log_collector::{get_default_logs_path, LogCollector};
use modsec_provision::models::DeployMode;
use modsec_provision::pipeline::{Pipeline, Plan};
use modsec_provision::system::NginxHost;

fn main() {
    let cli = parse_cli();

    // Logging first: every later step reports a leveled status line.
    let max_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let collector = match get_default_logs_path().and_then(LogCollector::new) {
        Ok(collector) => {
            if let Err(e) = collector.install(max_level) {
                eprintln!("[Main] WARNING: {}", e);
            }
            Some(collector)
        }
        Err(e) => {
            eprintln!("[Main] WARNING: file logging unavailable: {}", e);
            None
        }
    };

    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("[Main] FAILED: {}", e);
            1
        }
    };

    // Drain the log queue so the final status line reaches disk.
    if let Some(collector) = collector {
        if let Err(e) = collector.wait_for_empty() {
            eprintln!("[Main] WARNING: log flush failed: {}", e);
        }
    }

    std::process::exit(exit_code);
}

fn run(cli: &modsec_provision::cli::Cli) -> modsec_provision::Result<()> {
    let mut settings = loader::load_settings(cli.settings.as_deref())?;

    match &cli.command {
        Commands::Install {
            nginx_src,
            build_dir,
            reload_policy,
        } => {
            if let Some(dir) = nginx_src {
                settings.nginx_src_dir = dir.clone();
            }
            if let Some(dir) = build_dir {
                settings.build_dir = dir.clone();
            }
            if let Some(policy) = reload_policy {
                settings.reload_policy = *policy;
            }
            validator::validate_settings(&settings)?;

            let host = NginxHost::new(&settings.service)?;
            log::info!("[Main] Starting install run");
            Installer::new(&settings, &host).run()
        }
        Commands::Deploy {
            mirror,
            rules_dir,
            target,
            reload_policy,
        } => {
            if *mirror {
                settings.deploy_mode = DeployMode::Mirror;
            }
            if let Some(dir) = rules_dir {
                settings.rules_dir = dir.clone();
            }
            if let Some(dir) = target {
                settings.target_dir = dir.clone();
            }
            if let Some(policy) = reload_policy {
                settings.reload_policy = *policy;
            }
            validator::validate_settings(&settings)?;

            let host = NginxHost::new(&settings.service)?;
            let plan = Plan::from_settings(&settings)?;
            log::info!(
                "[Main] Starting deploy run ({:?} mode, reload policy '{}')",
                plan.mode,
                plan.reload_policy.as_str()
            );

            let mut pipeline = Pipeline::new(plan, &host);
            let report = pipeline.run()?;

            if let Some(snap) = &report.snapshot {
                log::info!("[Main] Snapshot kept at {}", snap.display());
            }
            if let Some(managed) = &report.managed {
                log::info!(
                    "[Main] Managed files: {} updated, {} skipped",
                    managed.applied_count(),
                    managed.skipped_count()
                );
            }
            if let Some(copied) = report.mirrored {
                log::info!("[Main] Mirrored {} file(s)", copied);
            }
            Ok(())
        }
    }
}
