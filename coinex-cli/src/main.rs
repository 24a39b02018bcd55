//! # CoinEx CLI
//!
//! Command-line interface for the CoinEx client.
//!
//! This CLI provides commands for:
//! - Opening and authenticating the spot and futures sessions
//! - Round-trip checks (`ping`, `time`, `rest-time`)
//! - Watching a stream channel until Ctrl-C
//! - Inspecting the effective configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use coinex_telemetry::logging::{LogConfig, LogFormat, init_logging};

use commands::{config, rest, session, watch};

/// CoinEx spot and futures client
#[derive(Parser)]
#[command(name = "coinex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, global = true, default_value = "coinex.yaml")]
    config: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    log_format: LogFormatArg,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate both sessions and report readiness
    Connect(session::SessionArgs),

    /// Send `server.ping` over the spot session
    Ping(session::SessionArgs),

    /// Query server time over the spot session
    Time(session::SessionArgs),

    /// Print pushes from one channel until Ctrl-C
    Watch(watch::WatchArgs),

    /// Query server time over REST
    RestTime,

    /// List announced maintenance windows
    Maintenance,

    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration with the secret omitted
    Show,

    /// List the environment variables that override the file
    Env,
}

/// Log format selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let _guards = init_logging(&LogConfig::stdout(level, cli.log_format.into()))
        .context("Failed to initialize logging")?;

    match cli.command {
        Commands::Connect(args) => session::connect(&cli.config, args).await?,
        Commands::Ping(args) => session::ping(&cli.config, args).await?,
        Commands::Time(args) => session::time(&cli.config, args).await?,
        Commands::Watch(args) => watch::run(&cli.config, args).await?,
        Commands::RestTime => rest::time(&cli.config).await?,
        Commands::Maintenance => rest::maintenance(&cli.config).await?,
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => config::show(&cli.config)?,
            ConfigCommands::Env => config::env(),
        },
    }

    Ok(())
}
