//! Retrace CLI
//!
//! Runs scripts of catalog operations through a history-recording store and
//! prints the resulting version history.
//!
//! # Commands
//!
//! - `run` - Execute a JSON script of save/delete/restore steps
//! - `demo` - Execute the built-in walkthrough
//! - `version` - Show version information
//!
//! # Scripts
//!
//! A script is a JSON array of steps:
//!
//! ```json
//! [
//!   { "op": "save", "id": 1, "name": "A", "price": 10 },
//!   { "op": "delete", "id": 1 },
//!   { "op": "restore", "id": 1, "version": 1 }
//! ]
//! ```

mod catalog;
mod commands;
mod script;

use clap::{Parser, Subcommand};
use retrace_core::{CommitMode, Config, TimestampPolicy, VersionStrategy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Entity history and restore, driven from the command line.
#[derive(Parser)]
#[command(name = "retrace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Write entity and history rows in one commit
    #[arg(global = true, long)]
    atomic: bool,

    /// Timestamp only the history row written on creation
    #[arg(global = true, long)]
    stamp_create_only: bool,

    /// Number versions in memory instead of in the store query
    #[arg(global = true, long)]
    eager: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::new();
        if self.atomic {
            config = config.commit_mode(CommitMode::Atomic);
        }
        if self.stamp_create_only {
            config = config.timestamp_policy(TimestampPolicy::CreateOnly);
        }
        if self.eager {
            config = config.version_strategy(VersionStrategy::Eager);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON script of catalog operations
    Run {
        /// Path to the script
        script: PathBuf,
    },

    /// Execute the built-in walkthrough
    Demo,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();
    match &cli.command {
        Commands::Run { script } => commands::run::run(script, config, &cli.format)?,
        Commands::Demo => commands::demo::run(config, &cli.format)?,
        Commands::Version => {
            println!("Retrace CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
