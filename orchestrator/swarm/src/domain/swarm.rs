// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Types
//!
//! - [`SwarmId`] - unique identifier (UUID newtype).
//! - [`WorkOrder`] / [`AgentOutput`] - what a worker is asked to do and what
//!   it hands back.
//! - [`AgentRun`] - one completed assignment with its receipt and delta.
//! - [`SwarmReport`] - the outcome of a whole run.

use chrono::{DateTime, Utc};
use kgc_core::domain::capacity::{Allocation, Schedule, Task, TaskAssignment};
use kgc_core::domain::delta::{Delta, Reconciliation};
use kgc_core::domain::receipt::Receipt;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a swarm run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwarmId(pub Uuid);

impl SwarmId {
    /// Generate a new random `SwarmId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SwarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One assignment handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub agent_id: String,
    pub task: Task,
    /// The agent's share of the swarm budget.
    pub resources: i64,
}

/// What a worker produced for one [`WorkOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    pub before: Vec<u8>,
    pub after: Vec<u8>,
    /// How to reproduce `before → after`. Stored, never executed.
    pub replay_script: String,
    /// Files the work touched.
    pub files: Vec<String>,
}

/// A completed assignment.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub assignment: TaskAssignment,
    /// Record hashes of the input and output facts appended to the log.
    pub input_record: String,
    pub output_record: String,
    pub delta: Delta,
}

impl AgentRun {
    pub fn receipt(&self) -> Option<&Receipt> {
        self.delta.receipt.as_ref()
    }
}

/// Outcome of [`crate::application::SwarmCoordinator::run`].
#[derive(Debug, Clone, Serialize)]
pub struct SwarmReport {
    pub swarm_id: SwarmId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub allocation: Allocation,
    pub schedule: Schedule,
    /// In schedule order.
    pub runs: Vec<AgentRun>,
    pub reconciliation: Reconciliation,
    /// Present only when every delta merged cleanly.
    pub global_receipt: Option<Receipt>,
    pub snapshot_hash: String,
    pub record_count: usize,
}

impl SwarmReport {
    pub fn is_clean(&self) -> bool {
        !self.reconciliation.has_conflicts()
    }

    pub fn receipts(&self) -> Vec<&Receipt> {
        self.runs.iter().filter_map(AgentRun::receipt).collect()
    }
}
