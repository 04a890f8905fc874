// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Execution Receipts
//!
//! A [`Receipt`] asserts "state A became state B via this script, run by this
//! agent at this time". Receipts are created once by
//! [`crate::application::receipt_chain::ReceiptChain`] and never mutated;
//! a divergent copy is exactly what tamper detection must catch.
//!
//! ## Wire Schema
//!
//! The JSON field order is the declaration order of [`Receipt`] and is part
//! of the schema: tamper detection hashes the serialized bytes, so the order
//! must never depend on map iteration. `proof_artifacts` is a `BTreeMap` for
//! the same reason.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Toolchain recorded in receipts unless configured otherwise.
pub const DEFAULT_TOOLCHAIN_VERSION: &str = concat!("rust", env!("CARGO_PKG_RUST_VERSION"));

/// Receipts older than this are rejected by default.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 365;

/// How a receipt's change composes with sibling changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionOp {
    #[default]
    Append,
    Merge,
    Replace,
}

/// What reconciliation does when this change overlaps another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    #[default]
    FailFast,
    Merge,
    Skip,
}

impl fmt::Display for CompositionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompositionOp::Append => "append",
            CompositionOp::Merge => "merge",
            CompositionOp::Replace => "replace",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictPolicy::FailFast => "fail_fast",
            ConflictPolicy::Merge => "merge",
            ConflictPolicy::Skip => "skip",
        };
        f.write_str(s)
    }
}

/// Proof that a transformation occurred.
///
/// Do not reorder these fields: declaration order is serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub execution_id: String,
    pub agent_id: String,
    /// Unix nanoseconds.
    pub timestamp: i64,
    pub toolchain_ver: String,
    /// SHA-256 of the before-state, lowercase hex.
    pub input_hash: String,
    /// SHA-256 of the after-state, lowercase hex.
    pub output_hash: String,
    pub proof_artifacts: BTreeMap<String, String>,
    /// Stored and hashed opaquely; never executed by the substrate.
    pub replay_script: String,
    pub composition_op: CompositionOp,
    pub conflict_policy: ConflictPolicy,
}

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("{0} cannot be empty")]
    EmptyInput(&'static str),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("invalid {field} length: {len}")]
    InvalidHashLength { field: &'static str, len: usize },

    #[error("{0} is not valid lowercase hex")]
    InvalidHashEncoding(&'static str),

    #[error("timestamp is in the future: {timestamp} > {now}")]
    FutureTimestamp { timestamp: i64, now: i64 },

    #[error("timestamp is too far in the past: {timestamp} < {oldest_allowed}")]
    StaleTimestamp { timestamp: i64, oldest_allowed: i64 },

    #[error("receipt {position} is invalid: {source}")]
    InvalidLink {
        position: usize,
        source: Box<ReceiptError>,
    },

    #[error("chain broken: R1.output_hash ({left}...) != R2.input_hash ({right}...)")]
    ChainBroken { left: String, right: String },

    #[error("temporal violation: R1.timestamp ({first}) >= R2.timestamp ({second})")]
    TemporalViolation { first: i64, second: i64 },

    #[error("cannot chain an empty receipt sequence")]
    EmptyChain,

    #[error("receipt serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&CompositionOp::Replace).unwrap(), "\"replace\"");
        assert_eq!(serde_json::to_string(&ConflictPolicy::FailFast).unwrap(), "\"fail_fast\"");
        assert_eq!(CompositionOp::Merge.to_string(), "merge");
        assert_eq!(ConflictPolicy::Skip.to_string(), "skip");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(CompositionOp::default(), CompositionOp::Append);
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::FailFast);
    }

    #[test]
    fn test_field_order_is_pinned() {
        let receipt = Receipt {
            execution_id: "e".to_string(),
            agent_id: "a".to_string(),
            timestamp: 1,
            toolchain_ver: "t".to_string(),
            input_hash: "i".to_string(),
            output_hash: "o".to_string(),
            proof_artifacts: BTreeMap::from([
                ("z".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ]),
            replay_script: "s".to_string(),
            composition_op: CompositionOp::Append,
            conflict_policy: ConflictPolicy::FailFast,
        };

        let json = serde_json::to_string(&receipt).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"execution_id":"e","agent_id":"a","timestamp":1,"toolchain_ver":"t","#,
                r#""input_hash":"i","output_hash":"o","proof_artifacts":{"b":"2","z":"1"},"#,
                r#""replay_script":"s","composition_op":"append","conflict_policy":"fail_fast"}"#
            )
        );
    }
}
