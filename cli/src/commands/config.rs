// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use kgc_core::domain::substrate_config::SubstrateConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./kgc-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate {
            output,
            examples,
            force,
        } => generate(&output, examples, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. KGC_CONFIG_PATH: {}",
            std::env::var("KGC_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./kgc-config.yaml");
        println!("  4. ~/.kgc/config.yaml");
        println!("  5. /etc/kgc/config.yaml");
        match SubstrateConfigManifest::discover_config() {
            Some(found) if config_override.is_none() => {
                println!("  {} {}", "→ using".green(), found.display())
            }
            None if config_override.is_none() => {
                println!("  {}", "→ none found, using defaults".yellow())
            }
            _ => {}
        }
        println!();
    }

    let config = SubstrateConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config).context("Failed to render configuration")?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let receipts = &config.spec.receipts;
    println!("{}", "Receipts:".bold());
    println!("  Toolchain: {}", receipts.toolchain_version);
    println!("  Max age: {} days", receipts.max_age_days);
    println!("  Composition: {} / {}", receipts.composition_op, receipts.conflict_policy);
    println!();

    println!("{}", "Knowledge Store:".bold());
    if config.spec.knowledge.metadata.is_empty() {
        println!("  Metadata: {}", "(none)".dimmed());
    }
    for (key, value) in &config.spec.knowledge.metadata {
        println!("  {} = {}", key, value);
    }
    println!();

    let swarm = &config.spec.swarm;
    println!("{}", "Swarm:".bold());
    println!("  Agents: {}", swarm.agent_count);
    println!("  Resource budget: {}", swarm.resource_budget);
    println!("  Strategy: {}", swarm.strategy);
    println!();

    let logging = config.logging();
    println!("{}", "Logging:".bold());
    println!("  Level: {}", logging.level);
    println!("  Format: {}", logging.format);
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SubstrateConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: &Path, with_examples: bool, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    let sample = sample_config(with_examples);
    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}
