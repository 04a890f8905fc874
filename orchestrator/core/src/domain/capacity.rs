// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capacity Domain Types
//!
//! Inputs and outputs of the allocator in
//! [`crate::application::capacity_allocator`]. Allocations and schedules are
//! computed fresh on every call and carry no identity of their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A schedulable worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique within a scheduling call.
    pub id: String,
    /// Minimum resources needed to function.
    #[serde(default)]
    pub min_resources: i64,
    /// Maximum resources this agent can use.
    #[serde(default)]
    pub max_resources: i64,
}

impl Agent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min_resources: 0,
            max_resources: 0,
        }
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique within a scheduling call.
    pub id: String,
    #[serde(default)]
    pub required_resources: i64,
    /// Higher is more important.
    #[serde(default)]
    pub priority: i32,
}

impl Task {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            required_resources: 0,
            priority,
        }
    }
}

/// Result of distributing a resource budget.
///
/// `assignments` sums with `remaining` to the original budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub assignments: BTreeMap<String, i64>,
    pub remaining: i64,
    /// Gini coefficient: 0 is perfectly equal, 1 is one agent holding everything.
    pub fairness: f64,
}

impl Allocation {
    pub fn total_assigned(&self) -> i64 {
        self.assignments.values().sum()
    }

    /// `max - min` over all assignments.
    pub fn spread(&self) -> i64 {
        spread(self.assignments.values().copied())
    }
}

/// One task bound to one agent at a position in the execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: String,
    pub agent_id: String,
    pub order: usize,
}

/// Deterministically ordered task assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub task_order: Vec<TaskAssignment>,
    /// Tasks per agent. Every input agent is present, idle ones with 0.
    pub agent_loads: BTreeMap<String, usize>,
}

impl Schedule {
    /// `max - min` over all agent loads.
    pub fn load_spread(&self) -> usize {
        let max = self.agent_loads.values().copied().max().unwrap_or(0);
        let min = self.agent_loads.values().copied().min().unwrap_or(0);
        max - min
    }

    /// Assignments for one agent, in execution order.
    pub fn tasks_for<'a>(&'a self, agent_id: &'a str) -> impl Iterator<Item = &'a TaskAssignment> + 'a {
        self.task_order.iter().filter(move |a| a.agent_id == agent_id)
    }
}

/// Shape of a resource exhaustion failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub reason: String,
    pub requested_resources: i64,
    pub available_resources: i64,
    pub deficit: i64,
}

/// Task assignment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStrategy {
    RoundRobin,
    #[default]
    Priority,
}

impl fmt::Display for ScheduleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStrategy::RoundRobin => f.write_str("round-robin"),
            ScheduleStrategy::Priority => f.write_str("priority"),
        }
    }
}

impl FromStr for ScheduleStrategy {
    type Err = CapacityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "round-robin" | "round_robin" | "roundrobin" => Ok(ScheduleStrategy::RoundRobin),
            "priority" => Ok(ScheduleStrategy::Priority),
            other => Err(CapacityError::UnknownStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("invalid agent count: {0} (must be > 0)")]
    InvalidAgentCount(usize),

    #[error("invalid resource budget: {0} (must be >= 0)")]
    NegativeBudget(i64),

    #[error("empty agent list: cannot schedule tasks")]
    EmptyAgents,

    #[error("empty task list: nothing to schedule")]
    EmptyTasks,

    #[error("duplicate agent ID: {0}")]
    DuplicateAgent(String),

    #[error("duplicate task ID: {0}")]
    DuplicateTask(String),

    #[error("unknown schedule strategy: {0}")]
    UnknownStrategy(String),
}

fn spread(values: impl Iterator<Item = i64>) -> i64 {
    let (min, max) = values.fold((i64::MAX, i64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min > max {
        0
    } else {
        max - min
    }
}
