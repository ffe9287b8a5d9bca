use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::auth::{DEFAULT_CLIENT_ID, DEFAULT_SCOPE};

#[derive(Parser)]
#[command(name = "bellatrix")]
#[command(about = "Bellatrix keeps Orion context broker subscriptions in sync with a declared state")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (also on when DEBUG is set to any value)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Compute the patches without applying them (also on when DRY_RUN is set to any value)
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Prefix identifying this Bellatrix instance's subscriptions
    #[arg(long, global = true, env = "INSTANCE_PREFIX")]
    pub instance_prefix: Option<String>,

    /// Settings file (defaults to ~/.bellatrix/config.toml)
    #[arg(short, long, global = true, env = "BELLATRIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

pub const DEBUG_ENV: &str = "DEBUG";
pub const DRY_RUN_ENV: &str = "DRY_RUN";

impl Cli {
    pub fn debug_enabled(&self) -> bool {
        self.debug || env_flag(DEBUG_ENV)
    }

    pub fn dry_run_enabled(&self) -> bool {
        self.dry_run || env_flag(DRY_RUN_ENV)
    }
}

/// A switch variable is on when present, whatever its value, including empty.
fn env_flag(name: &str) -> bool {
    std::env::var_os(name).is_some()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile the broker subscriptions with a state file
    Sync(SyncArgs),
    /// Fetch an access token and store it in a state file
    Token(TokenArgs),
    /// Print version information
    Version,
    /// Inspect the resolved settings
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Path to the declared state file
    #[arg(env = "STATE_FILE")]
    pub state_file: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct TokenArgs {
    /// OAuth2 token endpoint
    #[arg(long, env = "AUTH_SERVER_LOGIN_URL")]
    pub login_url: String,
    /// Account username
    #[arg(short, long, env = "WOBCOM_USERNAME")]
    pub username: String,
    /// Account password
    #[arg(long, env = "WOBCOM_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// OAuth2 client id
    #[arg(long, default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,
    /// Requested scopes, space separated
    #[arg(long, default_value = DEFAULT_SCOPE)]
    pub scope: String,
    /// State file to read
    #[arg(long, env = "BELLATRIX_INPUT_STATE_FILE_PATH")]
    pub input: PathBuf,
    /// Where to write the state file carrying the token
    #[arg(long, env = "BELLATRIX_OUTPUT_STATE_FILE_PATH")]
    pub output: PathBuf,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved settings
    Show,
}
