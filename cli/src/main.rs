// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # KGC Substrate CLI
//!
//! The `kgc` binary drives the knowledge coordination substrate from the
//! command line. Every command runs in-process against an in-memory store.
//!
//! ## Commands
//!
//! - `kgc demo` - Run a simulated swarm end to end
//! - `kgc allocate` - Split a resource budget across agents
//! - `kgc reconcile <FILE>` - Check a set of deltas for file conflicts
//! - `kgc receipt create|verify|chain` - Issue and check receipts
//! - `kgc config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use kgc_cli::commands::{
    self, AllocateCommand, ConfigCommand, DemoCommand, ReceiptCommand, ReconcileCommand,
};
use kgc_core::domain::substrate_config::SubstrateConfigManifest;

/// KGC Substrate - receipts, capacity and reconciliation for agent swarms
#[derive(Parser)]
#[command(name = "kgc")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "KGC_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error; default: spec.observability.logging.level)
    #[arg(long, global = true, env = "KGC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: text or json (default: spec.observability.logging.format)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated swarm and print its report
    #[command(name = "demo")]
    Demo(DemoCommand),

    /// Allocate a resource budget across agents
    #[command(name = "allocate")]
    Allocate(AllocateCommand),

    /// Reconcile a JSON file of deltas
    #[command(name = "reconcile")]
    Reconcile(ReconcileCommand),

    /// Receipt operations
    #[command(name = "receipt")]
    Receipt {
        #[command(subcommand)]
        command: ReceiptCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file must not stop `config validate` from reporting it
    let config = SubstrateConfigManifest::load_or_default(cli.config.clone()).ok();
    let logging = config
        .as_ref()
        .map(|c| c.logging())
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    let format = cli.log_format.clone().unwrap_or(logging.format);
    init_logging(&level, &format)?;

    let config = match config {
        Some(config) => config,
        None => {
            debug!("No usable configuration, falling back to defaults");
            SubstrateConfigManifest::default()
        }
    };

    match cli.command {
        Some(Commands::Demo(command)) => commands::demo::execute(command, &config).await,
        Some(Commands::Allocate(command)) => commands::allocate::execute(command, &config),
        Some(Commands::Reconcile(command)) => commands::reconcile::execute(command),
        Some(Commands::Receipt { command }) => {
            commands::receipt::handle_command(command, &config)
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_receipt_chain_with_global_config() {
        let cli = Cli::try_parse_from([
            "kgc", "--config", "c.yaml", "receipt", "chain", "a.json", "b.json", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Some(Commands::Receipt { .. })));
    }

    #[test]
    fn test_receipt_chain_needs_two_files() {
        assert!(Cli::try_parse_from(["kgc", "receipt", "chain", "a.json"]).is_err());
    }
}
