//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vpnsentry")]
#[command(about = "Bans VPN and proxy players on Teeworlds servers via econ")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "VPNSENTRY_CONFIG",
        default_value = "vpnsentry.toml"
    )]
    pub config: PathBuf,

    /// Only consult the local range cache, never the online providers
    #[arg(long, global = true)]
    pub offline: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "VPNSENTRY_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Watch the configured servers (default)
    Run,

    /// Import ban lists into the range cache
    Add {
        /// List files: one address, CIDR block or range per line
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove the ranges listed in the given files from the range cache
    Remove {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    pub fn action(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
