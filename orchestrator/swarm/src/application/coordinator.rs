// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Coordinator
//!
//! Drives one swarm run: plans capacity, dispatches every assignment
//! concurrently, records each agent's input and output in the knowledge log,
//! proves each transformation with a receipt, and reconciles the resulting
//! deltas.
//!
//! The substrate calls themselves are synchronous and short; concurrency
//! comes from the workers, which run as separate tokio tasks.

use super::{AgentWorker, SwarmError};
use crate::domain::{AgentRun, SwarmId, SwarmReport, WorkOrder};
use chrono::Utc;
use kgc_core::application::capacity_allocator::{allocate_resources, schedule};
use kgc_core::application::receipt_chain::now_nanos;
use kgc_core::application::{DeltaReconciler, ReceiptChain, ReceiptOptions, Reconciler};
use kgc_core::domain::capacity::{Agent, ScheduleStrategy, Task, TaskAssignment};
use kgc_core::domain::delta::{Delta, Reconciliation};
use kgc_core::domain::knowledge::{KnowledgeStore, Record};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Everything one assignment needs, shared across spawned tasks.
#[derive(Clone)]
struct RunContext {
    swarm_id: SwarmId,
    /// Distinguishes the log records of repeated runs on one coordinator.
    run_id: Uuid,
    store: Arc<dyn KnowledgeStore>,
    receipts: Arc<ReceiptChain>,
    receipt_options: ReceiptOptions,
    worker: Arc<dyn AgentWorker>,
    cancel: CancellationToken,
}

pub struct SwarmCoordinator {
    id: SwarmId,
    store: Arc<dyn KnowledgeStore>,
    receipts: Arc<ReceiptChain>,
    receipt_options: ReceiptOptions,
    reconciler: Arc<dyn Reconciler>,
    worker: Arc<dyn AgentWorker>,
    strategy: ScheduleStrategy,
    cancel: CancellationToken,
}

impl SwarmCoordinator {
    pub fn new(store: Arc<dyn KnowledgeStore>, worker: Arc<dyn AgentWorker>) -> Self {
        Self {
            id: SwarmId::new(),
            store,
            receipts: Arc::new(ReceiptChain::default()),
            receipt_options: ReceiptOptions::default(),
            reconciler: Arc::new(DeltaReconciler::new()),
            worker,
            strategy: ScheduleStrategy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: ScheduleStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_receipt_chain(mut self, receipts: ReceiptChain) -> Self {
        self.receipts = Arc::new(receipts);
        self
    }

    pub fn with_receipt_options(mut self, options: ReceiptOptions) -> Self {
        self.receipt_options = options;
        self
    }

    pub fn with_reconciler(mut self, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn id(&self) -> SwarmId {
        self.id
    }

    /// Token that stops this coordinator when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The coordinator's identity in receipts it composes.
    pub fn coordinator_id(&self) -> String {
        format!("coordinator-{}", self.id)
    }

    /// Run `tasks` across `agent_count` agents sharing `budget`.
    pub async fn run(
        &self,
        agent_count: usize,
        tasks: Vec<Task>,
        budget: i64,
    ) -> Result<SwarmReport, SwarmError> {
        let started_at = Utc::now();

        let allocation = allocate_resources(agent_count, budget)?;
        let agents: Vec<Agent> = allocation
            .assignments
            .iter()
            .map(|(id, share)| Agent {
                id: id.clone(),
                min_resources: 0,
                max_resources: *share,
            })
            .collect();
        let plan = schedule(self.strategy, &agents, &tasks)?;

        tracing::info!(
            swarm_id = %self.id,
            agents = agent_count,
            tasks = tasks.len(),
            budget,
            strategy = %self.strategy,
            "Dispatching swarm"
        );

        let ctx = RunContext {
            swarm_id: self.id,
            run_id: Uuid::new_v4(),
            store: Arc::clone(&self.store),
            receipts: Arc::clone(&self.receipts),
            receipt_options: self.receipt_options.clone(),
            worker: Arc::clone(&self.worker),
            cancel: self.cancel.clone(),
        };
        let tasks_by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

        let mut set = JoinSet::new();
        for assignment in &plan.task_order {
            if self.cancel.is_cancelled() {
                set.abort_all();
                return Err(SwarmError::Cancelled);
            }
            let Some(task) = tasks_by_id.get(assignment.task_id.as_str()) else {
                continue;
            };
            let order = WorkOrder {
                agent_id: assignment.agent_id.clone(),
                task: (*task).clone(),
                resources: allocation
                    .assignments
                    .get(&assignment.agent_id)
                    .copied()
                    .unwrap_or(0),
            };
            set.spawn(execute_assignment(ctx.clone(), assignment.clone(), order));
        }

        let mut runs = Vec::with_capacity(plan.task_order.len());
        while let Some(joined) = set.join_next().await {
            match joined? {
                Ok(run) => runs.push(run),
                Err(e) => {
                    tracing::warn!(swarm_id = %self.id, error = %e, "Agent run failed; aborting swarm");
                    set.abort_all();
                    return Err(e);
                }
            }
        }
        runs.sort_by_key(|run| run.assignment.order);

        let deltas: Vec<Delta> = runs.iter().map(|run| run.delta.clone()).collect();
        let reconciliation = self.reconciler.reconcile(&self.cancel, &deltas)?;

        let global_receipt = match &reconciliation {
            Reconciliation::Merged(_) if !runs.is_empty() => {
                let receipts: Vec<_> = runs.iter().filter_map(|r| r.receipt().cloned()).collect();
                Some(self.receipts.compose_global(&receipts, &self.coordinator_id())?)
            }
            Reconciliation::Merged(_) => None,
            Reconciliation::Conflicted(report) => {
                tracing::warn!(
                    swarm_id = %self.id,
                    conflicts = report.conflicts().len(),
                    "Swarm produced conflicting deltas; no global receipt issued"
                );
                None
            }
        };

        let snapshot = self.store.snapshot(&self.cancel)?;
        tracing::info!(
            swarm_id = %self.id,
            runs = runs.len(),
            clean = !reconciliation.has_conflicts(),
            snapshot = %snapshot.hash,
            "Swarm run finished"
        );

        Ok(SwarmReport {
            swarm_id: self.id,
            started_at,
            finished_at: Utc::now(),
            allocation,
            schedule: plan,
            runs,
            reconciliation,
            global_receipt,
            snapshot_hash: snapshot.hash,
            record_count: self.store.len(),
        })
    }
}

async fn execute_assignment(
    ctx: RunContext,
    assignment: TaskAssignment,
    order: WorkOrder,
) -> Result<AgentRun, SwarmError> {
    if ctx.cancel.is_cancelled() {
        return Err(SwarmError::Cancelled);
    }

    let agent_id = order.agent_id.clone();
    let task_id = order.task.id.clone();
    let record_prefix = format!("{}/{}/{}/{}", ctx.swarm_id, ctx.run_id, agent_id, task_id);

    let input = Record::new(
        format!("{}/input", record_prefix),
        now_nanos(),
        format!(
            "task={} priority={} resources={}",
            task_id, order.task.priority, order.resources
        ),
    )
    .with_tag("agent", agent_id.as_str())
    .with_tag("task", task_id.as_str())
    .with_tag("kind", "input");
    let input_record = ctx.store.append(&ctx.cancel, input)?;

    let output = ctx
        .worker
        .execute(&order)
        .await
        .map_err(|e| SwarmError::Worker {
            agent_id: agent_id.clone(),
            task_id: task_id.clone(),
            message: format!("{:#}", e),
        })?;

    let output_fact = Record::new(format!("{}/output", record_prefix), now_nanos(), output.after.clone())
        .with_tag("agent", agent_id.as_str())
        .with_tag("task", task_id.as_str())
        .with_tag("kind", "output");
    let output_record = ctx.store.append(&ctx.cancel, output_fact)?;

    let options = ctx.receipt_options.clone().with_artifact("task", task_id.as_str());
    let receipt = ctx.receipts.create_receipt_with(
        &output.before,
        &output.after,
        &output.replay_script,
        &agent_id,
        options,
    )?;

    let delta = Delta::new(format!("{}:{}", agent_id, task_id), output.files, Some(receipt));
    tracing::debug!(
        swarm_id = %ctx.swarm_id,
        agent_id = %agent_id,
        task_id = %task_id,
        files = delta.files.len(),
        "Agent run recorded"
    );

    Ok(AgentRun {
        assignment,
        input_record,
        output_record,
        delta,
    })
}
