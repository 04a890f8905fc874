// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Swarm demonstration command
//!
//! Runs a simulated swarm end to end against an in-memory substrate and
//! prints what each component did: allocation, schedule, per-agent receipts,
//! reconciliation and the final snapshot.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use kgc_core::application::{ReceiptChain, ReceiptChainConfig, ReceiptOptions};
use kgc_core::domain::capacity::{ScheduleStrategy, Task};
use kgc_core::domain::delta::Reconciliation;
use kgc_core::domain::substrate_config::SubstrateConfigManifest;
use kgc_core::infrastructure::InMemoryKnowledgeStore;
use kgc_swarm::application::{SimulatedWorker, SwarmCoordinator};
use kgc_swarm::domain::SwarmReport;

/// File every simulated agent touches when `--conflict` is set.
const SHARED_FILE: &str = "/shared/manifest.json";

#[derive(Args)]
pub struct DemoCommand {
    /// Number of agents (default: spec.swarm.agent_count)
    #[arg(long)]
    agents: Option<usize>,

    /// Number of tasks to schedule
    #[arg(long, default_value_t = 6)]
    tasks: usize,

    /// Resource budget (default: spec.swarm.resource_budget)
    #[arg(long)]
    budget: Option<i64>,

    /// Scheduling strategy: round-robin or priority (default: spec.swarm.strategy)
    #[arg(long)]
    strategy: Option<ScheduleStrategy>,

    /// Make every agent touch a shared file to force a conflict
    #[arg(long)]
    conflict: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(command: DemoCommand, config: &SubstrateConfigManifest) -> Result<()> {
    let agents = command.agents.unwrap_or(config.spec.swarm.agent_count);
    let budget = command.budget.unwrap_or(config.spec.swarm.resource_budget);
    let strategy = command.strategy.unwrap_or(config.spec.swarm.strategy);

    let store = Arc::new(InMemoryKnowledgeStore::with_metadata(
        config.spec.knowledge.metadata.clone(),
    ));
    let worker = if command.conflict {
        SimulatedWorker::with_shared_file(SHARED_FILE)
    } else {
        SimulatedWorker::new()
    };

    let coordinator = SwarmCoordinator::new(store, Arc::new(worker))
        .with_strategy(strategy)
        .with_receipt_chain(ReceiptChain::new(ReceiptChainConfig::from(&config.spec.receipts)))
        .with_receipt_options(ReceiptOptions::from(&config.spec.receipts));

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling swarm");
            cancel.cancel();
        }
    });

    let report = coordinator
        .run(agents, demo_tasks(command.tasks), budget)
        .await
        .context("Swarm run failed")?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, strategy);
    }
    Ok(())
}

/// `count` tasks with priorities cycling through 1..=5.
pub fn demo_tasks(count: usize) -> Vec<Task> {
    (0..count)
        .map(|i| Task {
            id: format!("task-{:02}", i),
            required_resources: 1,
            priority: (i % 5) as i32 + 1,
        })
        .collect()
}

fn print_report(report: &SwarmReport, strategy: ScheduleStrategy) {
    println!("{} {}", "Swarm".bold(), report.swarm_id.to_string().dimmed());
    println!();

    println!("{}", "Allocation:".bold());
    for (agent, share) in &report.allocation.assignments {
        println!("  {:<10} {}", agent, share);
    }
    println!("  Gini: {:.4}", report.allocation.fairness);
    println!();

    println!("{} ({})", "Schedule:".bold(), strategy);
    for run in &report.runs {
        let receipt = run
            .receipt()
            .map(|r| r.execution_id.as_str())
            .unwrap_or("-");
        println!(
            "  #{:<3} {:<10} → {:<10} receipt {}",
            run.assignment.order,
            run.assignment.task_id,
            run.assignment.agent_id,
            receipt.dimmed()
        );
    }
    println!();

    println!("{}", "Reconciliation:".bold());
    match &report.reconciliation {
        Reconciliation::Merged(delta) => {
            println!("  {}", format!("✓ merged {} files", delta.files.len()).green());
            println!("  Checksum: {}", delta.checksum);
        }
        Reconciliation::Conflicted(conflicts) => {
            for description in conflicts.descriptions() {
                println!("  {} {}", "✗".red(), description);
            }
        }
    }
    println!();

    match &report.global_receipt {
        Some(global) => {
            println!("{}", "Global receipt:".bold());
            println!("  Execution: {}", global.execution_id);
            println!("  Input:     {}", global.input_hash);
            println!("  Output:    {}", global.output_hash);
        }
        None => println!("{}", "No global receipt (conflicts must be resolved first)".yellow()),
    }
    println!();

    println!("{}", "Knowledge log:".bold());
    println!("  Records:  {}", report.record_count);
    println!("  Snapshot: {}", report.snapshot_hash);
}
