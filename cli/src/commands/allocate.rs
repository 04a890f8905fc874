// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource allocation command

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use kgc_core::application::capacity_allocator::{allocate_resources, exhaustion_test};
use kgc_core::domain::substrate_config::SubstrateConfigManifest;

#[derive(Args)]
pub struct AllocateCommand {
    /// Number of agents (default: spec.swarm.agent_count)
    #[arg(long)]
    agents: Option<usize>,

    /// Resource budget (default: spec.swarm.resource_budget)
    #[arg(long)]
    budget: Option<i64>,

    /// Also show the report for requesting one unit more than the budget
    #[arg(long)]
    exhaustion: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub fn execute(command: AllocateCommand, config: &SubstrateConfigManifest) -> Result<()> {
    let agents = command.agents.unwrap_or(config.spec.swarm.agent_count);
    let budget = command.budget.unwrap_or(config.spec.swarm.resource_budget);

    let allocation = allocate_resources(agents, budget)
        .with_context(|| format!("Cannot allocate {} units across {} agents", budget, agents))?;
    let exhaustion = command.exhaustion.then(|| exhaustion_test(budget));

    if command.json {
        let body = serde_json::json!({
            "allocation": allocation,
            "exhaustion": exhaustion,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", format!("Allocation of {} units across {} agents:", budget, agents).bold());
    for (agent, share) in &allocation.assignments {
        println!("  {:<10} {}", agent, share);
    }
    println!("  Remaining: {}", allocation.remaining);
    println!("  Spread:    {}", allocation.spread());
    println!("  Gini:      {:.4}", allocation.fairness);

    if let Some(report) = exhaustion {
        println!();
        println!("{}", "Exhaustion test:".bold());
        println!("  {}", report.reason.yellow());
        println!("  Deficit: {}", report.deficit);
    }
    Ok(())
}
