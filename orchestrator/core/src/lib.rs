// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `kgc-core` - Knowledge Coordination Substrate
//!
//! The substrate that lets concurrently running agents combine their work
//! safely. Everything here is in-memory and synchronous; agents and the
//! orchestration layer around them are external collaborators.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Record`, `Receipt`, `Delta`, `Agent`/`Task`, config manifest, error enums |
//! | [`application`] | Application | `ReceiptChain`, capacity allocation, `DeltaReconciler` |
//! | [`infrastructure`] | Infrastructure | `InMemoryKnowledgeStore` |
//!
//! ## Invariants
//!
//! - Snapshots are byte-identical for identical logical state.
//! - Receipts are tamper-evident: any single-field mutation changes the
//!   hash of their serialized form.
//! - Allocations and schedules are pure functions of their inputs.
//! - Reconciliation never merges two deltas that touch the same file.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
