// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `kgc-swarm` - Concurrent Agent Coordination
//!
//! Runs a group of agents (a **Swarm**) concurrently against the substrate
//! and combines their work:
//!
//! ```text
//! allocate budget ─▶ schedule tasks ─▶ dispatch (JoinSet)
//!     per assignment: append input ─▶ worker ─▶ append output ─▶ receipt ─▶ delta
//! ─▶ reconcile deltas ─▶ global receipt (clean merge only) ─▶ final snapshot
//! ```
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `SwarmId`, `WorkOrder`, `AgentOutput`, `AgentRun`, `SwarmReport` |
//! | [`application`] | Application | `AgentWorker` seam, `SimulatedWorker`, `SwarmCoordinator` |
//!
//! ## Key Concepts
//!
//! - **AgentWorker**: the external collaborator that does an agent's actual
//!   work. The substrate only records, proves and reconciles it.
//! - **Fail-fast reconciliation**: a swarm whose agents touched the same file
//!   produces a conflict report and no global receipt; re-dispatching the
//!   conflicting agents is the caller's decision.
//! - **Cancellation**: cancelling the coordinator's token stops dispatch and
//!   makes in-flight substrate calls fail with a cancellation error.

pub mod domain;
pub mod application;

pub use domain::*;
