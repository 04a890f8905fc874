// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm Application Services
//!
//! The [`AgentWorker`] seam through which external agents plug in, and the
//! [`SwarmCoordinator`] that drives a run end to end.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Dispatch concurrent agent work and reconcile the results

pub mod coordinator;
pub mod worker;

pub use coordinator::SwarmCoordinator;
pub use worker::SimulatedWorker;

use crate::domain::{AgentOutput, WorkOrder};
use anyhow::Result;
use async_trait::async_trait;
use kgc_core::domain::capacity::CapacityError;
use kgc_core::domain::delta::ReconcileError;
use kgc_core::domain::knowledge::KnowledgeError;
use kgc_core::domain::receipt::ReceiptError;
use thiserror::Error;

/// Performs one agent's work for one task.
#[async_trait]
pub trait AgentWorker: Send + Sync {
    async fn execute(&self, order: &WorkOrder) -> Result<AgentOutput>;
}

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("capacity planning failed: {0}")]
    Capacity(#[from] CapacityError),

    #[error("knowledge store rejected an operation: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("agent {agent_id} failed task {task_id}: {message}")]
    Worker {
        agent_id: String,
        task_id: String,
        message: String,
    },

    #[error("agent task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("swarm run cancelled")]
    Cancelled,
}
