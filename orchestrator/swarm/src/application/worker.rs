// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use super::AgentWorker;
use crate::domain::{AgentOutput, WorkOrder};
use anyhow::Result;
use async_trait::async_trait;

/// Deterministic stand-in for a real agent.
///
/// Each task writes `/<agent>/<task>.result`, so distinct assignments never
/// overlap. A shared file, when configured, is touched by every task and
/// forces a reconciliation conflict whenever more than one task runs.
#[derive(Debug, Clone, Default)]
pub struct SimulatedWorker {
    shared_file: Option<String>,
}

impl SimulatedWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shared_file(path: impl Into<String>) -> Self {
        Self {
            shared_file: Some(path.into()),
        }
    }
}

#[async_trait]
impl AgentWorker for SimulatedWorker {
    async fn execute(&self, order: &WorkOrder) -> Result<AgentOutput> {
        if order.agent_id.is_empty() || order.task.id.is_empty() {
            anyhow::bail!("work order must name an agent and a task");
        }

        // Let sibling workers interleave.
        tokio::task::yield_now().await;

        let agent = &order.agent_id;
        let task = &order.task.id;

        let mut files = vec![format!("/{}/{}.result", agent, task)];
        if let Some(shared) = &self.shared_file {
            files.push(shared.clone());
        }

        Ok(AgentOutput {
            before: format!("{}:{}:pending", agent, task).into_bytes(),
            after: format!(
                "{}:{}:done priority={} resources={}",
                agent, task, order.task.priority, order.resources
            )
            .into_bytes(),
            replay_script: format!("kgc-sim run --agent {} --task {}", agent, task),
            files,
        })
    }
}
