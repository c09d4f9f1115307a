//! Minebrain CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a default config file
//! - `config`   — Show, locate or validate the configuration
//! - `parse`    — Dry-run the command grammar over stdin
//! - `run`      — Join a server through the game bridge
//! - `offline`  — Talk to a simulated world from the terminal

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "minebrain",
    about = "Minebrain — drive a Minecraft agent with a language model",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.minebrain/config.toml
    #[arg(short, long, global = true, env = "MINEBRAIN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Parse model output from stdin and print the resulting commands
    Parse {
        /// Apply the reply delimiter before parsing
        #[arg(long)]
        raw: bool,

        /// Print commands as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Connect to the game bridge and serve chat
    Run,

    /// Serve chat typed on stdin against a simulated world
    Offline {
        /// Operator name used for console lines
        #[arg(long, default_value = "console")]
        operator: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the configuration and report warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config;
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
        },
        Commands::Parse { raw, json } => commands::parse::run(config_path, raw, json).await?,
        Commands::Run => commands::run::run(config_path).await?,
        Commands::Offline { operator } => commands::offline::run(config_path, operator).await?,
    }

    Ok(())
}
