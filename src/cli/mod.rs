//! Command-line interface definitions.

pub mod check;
pub mod diagnostic;
pub mod output;
pub mod registry;
pub mod run;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_GAMMA_URL;
use crate::domain::AssetRole;

/// Kingmaker - live monitor for presidential prediction markets.
#[derive(Parser, Debug)]
#[command(name = "kingmaker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream prices and publish metrics until interrupted
    Run(RunArgs),

    /// Validate the configuration and asset mapping
    Check(ConfigPathArg),

    /// Show the latest persisted snapshot of every market
    Status(StatusArgs),

    /// Generate a mapping-file market from a Gamma event
    Registry(RegistryArgs),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Do not seed the book from persisted snapshots
    #[arg(long)]
    pub no_restore: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Print the records as JSON lines instead of tables
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `registry` subcommand.
#[derive(Parser, Debug)]
pub struct RegistryArgs {
    /// Gamma event slug, e.g. `democratic-presidential-nominee-2028`
    #[arg(long)]
    pub slug: String,

    /// Role of every asset in the event (nomination, winner, party)
    #[arg(long, value_parser = parse_role)]
    pub role: AssetRole,

    /// Party whose nomination the event prices (nomination role only)
    #[arg(long)]
    pub party: Option<String>,

    /// Append to this mapping file instead of printing
    #[arg(long)]
    pub append: Option<PathBuf>,

    /// Gamma API base URL
    #[arg(long, default_value = DEFAULT_GAMMA_URL)]
    pub gamma_url: String,
}

fn parse_role(raw: &str) -> Result<AssetRole, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "nomination" => Ok(AssetRole::Nomination),
        "winner" => Ok(AssetRole::Winner),
        "party" => Ok(AssetRole::Party),
        other => Err(format!(
            "unknown role {other:?}; expected nomination, winner or party"
        )),
    }
}
