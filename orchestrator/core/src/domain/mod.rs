// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Substrate Domain Layer
//!
//! Pure domain types. No locking; only the config manifest touches the
//! filesystem.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`digest`] | SHA-256 hex helpers |
//! | [`knowledge`] | `Record`, `Event`, `SnapshotData`, `KnowledgeStore` trait |
//! | [`receipt`] | `Receipt`, `CompositionOp`, `ConflictPolicy` |
//! | [`capacity`] | `Agent`, `Task`, `Allocation`, `Schedule`, `FailureReport` |
//! | [`delta`] | `Delta`, `ConflictReport`, `Reconciliation` |
//! | [`path_normalizer`] | `PathNormalizer` for delta file paths |
//! | [`substrate_config`] | `SubstrateConfigManifest` |

pub mod digest;
pub mod knowledge;
pub mod receipt;
pub mod capacity;
pub mod delta;
pub mod path_normalizer;
pub mod substrate_config;
