// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capacity Allocator
//!
//! Fair division of a resource budget and deterministic task scheduling.
//! Every function here is referentially transparent: no shared state, no
//! side effects, safe to call from any number of threads.
//!
//! | Function | Guarantee |
//! |----------|-----------|
//! | [`allocate_resources`] | `max - min <= 1`, sum equals the budget |
//! | [`round_robin_schedule`] | agent loads differ by at most 1 |
//! | [`priority_schedule`] | higher priority never runs after lower; loads differ by at most 1 |
//! | [`exhaustion_test`] | shape of a failure report |

use crate::domain::capacity::{
    Agent, Allocation, CapacityError, FailureReport, Schedule, ScheduleStrategy, Task,
    TaskAssignment,
};
use std::collections::{BTreeMap, HashSet};

/// Split `budget` across `agent_count` agents named `agent-0..agent-{n-1}`.
///
/// The first `budget % agent_count` agents receive one extra unit.
pub fn allocate_resources(agent_count: usize, budget: i64) -> Result<Allocation, CapacityError> {
    if agent_count == 0 {
        return Err(CapacityError::InvalidAgentCount(agent_count));
    }
    if budget < 0 {
        return Err(CapacityError::NegativeBudget(budget));
    }

    let n = i64::try_from(agent_count).map_err(|_| CapacityError::InvalidAgentCount(agent_count))?;
    let base = budget / n;
    let remainder = budget % n;

    let mut assignments = BTreeMap::new();
    let mut shares = Vec::with_capacity(agent_count);
    for index in 0..n {
        let share = if index < remainder { base + 1 } else { base };
        assignments.insert(format!("agent-{}", index), share);
        shares.push(share);
    }

    Ok(Allocation {
        assignments,
        remaining: 0,
        fairness: gini_coefficient(&shares),
    })
}

/// Gini coefficient of `values`: 0 is perfectly equal.
///
/// An empty or all-zero input counts as perfectly equal.
pub fn gini_coefficient(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len() as f64;
    let total: f64 = sorted.iter().map(|&v| v as f64).sum();
    if total == 0.0 {
        return 0.0;
    }

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 + 1.0) * v as f64)
        .sum();

    let gini = (2.0 * weighted) / (n * total) - (n + 1.0) / n;
    // Float error can push an equal split a hair below zero.
    gini.max(0.0)
}

/// Assign task `i` (by ID order) to agent `i mod n` (by ID order).
pub fn round_robin_schedule(agents: &[Agent], tasks: &[Task]) -> Result<Schedule, CapacityError> {
    validate(agents, tasks)?;

    let agents = sorted_agent_ids(agents);
    let mut tasks: Vec<&Task> = tasks.iter().collect();
    tasks.sort_by(|a, b| a.id.cmp(&b.id));

    let mut loads = idle_loads(&agents);
    let task_order = tasks
        .iter()
        .enumerate()
        .map(|(order, task)| {
            let agent_id = agents[order % agents.len()];
            *loads.entry(agent_id.to_string()).or_default() += 1;
            TaskAssignment {
                task_id: task.id.clone(),
                agent_id: agent_id.to_string(),
                order,
            }
        })
        .collect();

    Ok(Schedule {
        task_order,
        agent_loads: loads,
    })
}

/// Assign tasks by descending priority, each to the least loaded agent.
///
/// Ties on priority break by task ID, ties on load by agent ID.
pub fn priority_schedule(agents: &[Agent], tasks: &[Task]) -> Result<Schedule, CapacityError> {
    validate(agents, tasks)?;

    let agents = sorted_agent_ids(agents);
    let mut tasks: Vec<&Task> = tasks.iter().collect();
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

    let mut counts = vec![0usize; agents.len()];
    let mut task_order = Vec::with_capacity(tasks.len());
    for (order, task) in tasks.iter().enumerate() {
        // `min_by_key` keeps the first minimum, i.e. the lowest agent ID.
        let slot = counts
            .iter()
            .enumerate()
            .min_by_key(|(_, load)| **load)
            .map(|(slot, _)| slot)
            .unwrap_or(0);
        counts[slot] += 1;
        task_order.push(TaskAssignment {
            task_id: task.id.clone(),
            agent_id: agents[slot].to_string(),
            order,
        });
    }

    Ok(Schedule {
        task_order,
        agent_loads: agents
            .iter()
            .zip(counts)
            .map(|(id, load)| (id.to_string(), load))
            .collect(),
    })
}

/// Dispatch to the scheduler for `strategy`.
pub fn schedule(
    strategy: ScheduleStrategy,
    agents: &[Agent],
    tasks: &[Task],
) -> Result<Schedule, CapacityError> {
    match strategy {
        ScheduleStrategy::RoundRobin => round_robin_schedule(agents, tasks),
        ScheduleStrategy::Priority => priority_schedule(agents, tasks),
    }
}

/// Report for a request of `limit + 1` units against a budget of `limit`.
pub fn exhaustion_test(limit: i64) -> FailureReport {
    let requested = limit.saturating_add(1);
    FailureReport {
        reason: format!(
            "resource exhaustion: requested {} units but only {} available",
            requested, limit
        ),
        requested_resources: requested,
        available_resources: limit,
        deficit: requested - limit,
    }
}

fn validate(agents: &[Agent], tasks: &[Task]) -> Result<(), CapacityError> {
    if agents.is_empty() {
        return Err(CapacityError::EmptyAgents);
    }
    if tasks.is_empty() {
        return Err(CapacityError::EmptyTasks);
    }

    let mut seen = HashSet::with_capacity(agents.len());
    for agent in agents {
        if !seen.insert(agent.id.as_str()) {
            return Err(CapacityError::DuplicateAgent(agent.id.clone()));
        }
    }

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(CapacityError::DuplicateTask(task.id.clone()));
        }
    }
    Ok(())
}

fn sorted_agent_ids(agents: &[Agent]) -> Vec<&str> {
    let mut ids: Vec<&str> = agents.iter().map(|a| a.id.as_str()).collect();
    ids.sort_unstable();
    ids
}

fn idle_loads(agent_ids: &[&str]) -> BTreeMap<String, usize> {
    agent_ids.iter().map(|id| (id.to_string(), 0)).collect()
}
