// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application Services
//!
//! Stateless services over the domain types. None of them hold shared
//! mutable state, so none of them lock.
//!
//! # Architecture
//!
//! - **Layer:** Application
//! - **Purpose:** Receipt issuance and verification, capacity planning,
//!   delta reconciliation

pub mod receipt_chain;
pub mod capacity_allocator;
pub mod reconciler;

pub use receipt_chain::{ReceiptChain, ReceiptChainConfig, ReceiptOptions};
pub use reconciler::{DeltaReconciler, Reconciler};
