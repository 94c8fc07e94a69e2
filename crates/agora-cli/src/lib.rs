//! Command line front end for agora.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

pub use commands::boot;

const DEFAULT_FILTER: &str = "agora=info,agora_core=info,agora_providers=info";
const VERBOSE_FILTER: &str = "agora=debug,agora_core=debug,agora_providers=debug";

#[derive(Debug, Parser)]
#[command(name = "agora")]
#[command(about = "Multi-agent conversations over in-process channels")]
#[command(version)]
pub struct Cli {
    /// Directory holding the roster YAML files
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Optional TOML settings file; AGORA__* environment variables override it
    #[arg(long, global = true, default_value = "agora.toml")]
    pub settings: PathBuf,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Boot the system and let the agents talk until Ctrl-C
    Run {
        /// Stop on its own after this many seconds
        #[arg(long)]
        for_secs: Option<u64>,
    },

    /// Print the agent directory as JSON
    Agents,

    /// Print the channel directory as JSON
    Channels,

    /// Send one message as an agent and print what the agent saw afterwards
    Send {
        #[arg(long)]
        agent: String,

        #[arg(long)]
        channel: String,

        content: String,

        /// How long to wait for replies before printing (milliseconds)
        #[arg(long, default_value_t = 500)]
        settle_ms: u64,
    },

    /// Create a private channel as an agent and announce it on another channel
    Share {
        #[arg(long)]
        agent: String,

        #[arg(long)]
        channel_id: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Channel the announcement goes to
        #[arg(long)]
        on: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    commands::execute(cli).await
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
