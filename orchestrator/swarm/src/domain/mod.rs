// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure domain types for a swarm run. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `SwarmId`, `WorkOrder`, `AgentOutput`, `AgentRun`, `SwarmReport` |

pub mod swarm;

pub use swarm::*;
