use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_ENDPOINT, ENV_PROJECT, ENV_STAGING_DIR, ENV_TOKEN_ENV,
    ENV_UPLOAD_TIMEOUT_SECS,
};

#[derive(Parser)]
#[command(name = "tracerelay")]
#[command(version, about = "Inspect and upload staged traces", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Project name sent with uploads
    #[arg(long, short = 'p', global = true, env = ENV_PROJECT)]
    pub project: Option<String>,

    /// Directory holding staged trace files
    #[arg(long, global = true, env = ENV_STAGING_DIR)]
    pub staging_dir: Option<PathBuf>,

    /// Collector base URL
    #[arg(long, global = true, env = ENV_ENDPOINT)]
    pub endpoint: Option<String>,

    /// Upload timeout in seconds
    #[arg(long, global = true, env = ENV_UPLOAD_TIMEOUT_SECS)]
    pub upload_timeout_secs: Option<u64>,

    /// Name of the environment variable holding the bearer token
    #[arg(long, global = true, env = ENV_TOKEN_ENV)]
    pub token_env: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List staged traces (default command)
    Status,
    /// Upload staged trace snapshots
    Flush {
        /// Only upload this trace id
        #[arg(long)]
        trace: Option<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub project: Option<String>,
    pub staging_dir: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub upload_timeout_secs: Option<u64>,
    pub token_env: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        project: cli.project,
        staging_dir: cli.staging_dir,
        endpoint: cli.endpoint,
        upload_timeout_secs: cli.upload_timeout_secs,
        token_env: cli.token_env,
    };
    (config, cli.command)
}
