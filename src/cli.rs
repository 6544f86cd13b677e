use crate::models::ReloadPolicy;
use clap::Parser;
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    /// Settings file (JSON); defaults to
    /// ~/.config/modsec-provision/settings.json when present
    #[arg(long, value_name = "FILE", global = true)]
    pub settings: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Install the WAF engine and connector module into the host nginx
    Install {
        /// nginx source tree used to build the dynamic module
        #[arg(long, value_name = "DIR")]
        nginx_src: Option<PathBuf>,

        /// Scratch directory for source checkouts
        #[arg(long, value_name = "DIR")]
        build_dir: Option<PathBuf>,

        /// Whether the config self-test gates the reload
        #[arg(long, value_enum)]
        reload_policy: Option<ReloadPolicy>,
    },

    /// Deploy local rules into the WAF config directory
    Deploy {
        /// Mirror the whole rules tree instead of the managed-file list
        #[arg(long, default_value_t = false)]
        mirror: bool,

        /// Local rules directory (default: ./rules)
        #[arg(long, value_name = "DIR")]
        rules_dir: Option<PathBuf>,

        /// Target WAF config directory (default: /etc/nginx/modsec)
        #[arg(long, value_name = "DIR")]
        target: Option<PathBuf>,

        /// Whether the config self-test gates the reload
        #[arg(long, value_enum)]
        reload_policy: Option<ReloadPolicy>,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
