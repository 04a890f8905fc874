// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Receipt Chain Service
//!
//! Creates, verifies, chains and tamper-checks [`Receipt`]s. The service
//! holds configuration only; every operation is a pure function of its
//! inputs and the wall clock, so one instance can be shared freely across
//! threads.
//!
//! ## Chaining
//!
//! ```text
//! R1 { input: A, output: B, t1 }  ──▶  R2 { input: B, output: C, t2 }
//!          R1.output_hash == R2.input_hash   and   t1 < t2
//! ```
//!
//! ## Tamper Detection
//!
//! [`ReceiptChain::detect_tamper`] re-serializes a receipt and compares the
//! SHA-256 of those bytes with the SHA-256 of the bytes originally issued.
//! Soundness rests on the pinned field order of the wire schema (see
//! [`crate::domain::receipt`]).

use crate::domain::digest::{combined_hash, is_lower_hex, sha256_hex, SHA256_HEX_LEN};
use crate::domain::receipt::{
    CompositionOp, ConflictPolicy, Receipt, ReceiptError, DEFAULT_MAX_AGE_DAYS,
    DEFAULT_TOOLCHAIN_VERSION,
};
use crate::domain::substrate_config::ReceiptsConfig;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Proof artifact key holding the number of composed sub-receipts.
pub const ARTIFACT_SUB_RECEIPTS: &str = "sub_receipts";
/// Proof artifact key holding the sorted, comma-separated execution IDs.
pub const ARTIFACT_EXECUTIONS: &str = "executions";

/// Prefix length used when quoting hashes in error messages.
const HASH_PREVIEW_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct ReceiptChainConfig {
    pub toolchain_version: String,
    /// Oldest acceptable receipt, relative to verification time.
    pub max_age: Duration,
}

impl Default for ReceiptChainConfig {
    fn default() -> Self {
        Self {
            toolchain_version: DEFAULT_TOOLCHAIN_VERSION.to_string(),
            max_age: Duration::days(i64::from(DEFAULT_MAX_AGE_DAYS)),
        }
    }
}

impl From<&ReceiptsConfig> for ReceiptChainConfig {
    fn from(config: &ReceiptsConfig) -> Self {
        Self {
            toolchain_version: config.toolchain_version.clone(),
            max_age: Duration::days(i64::from(config.max_age_days)),
        }
    }
}

/// Caller overrides for a new receipt.
#[derive(Debug, Clone, Default)]
pub struct ReceiptOptions {
    pub composition_op: CompositionOp,
    pub conflict_policy: ConflictPolicy,
    pub proof_artifacts: BTreeMap<String, String>,
}

impl ReceiptOptions {
    pub fn with_artifact(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.proof_artifacts.insert(key.into(), value.into());
        self
    }
}

impl From<&ReceiptsConfig> for ReceiptOptions {
    fn from(config: &ReceiptsConfig) -> Self {
        Self {
            composition_op: config.composition_op,
            conflict_policy: config.conflict_policy,
            proof_artifacts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReceiptChain {
    config: ReceiptChainConfig,
}

impl ReceiptChain {
    pub fn new(config: ReceiptChainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReceiptChainConfig {
        &self.config
    }

    /// Receipt for `before → after` with default composition semantics
    /// (`append` / `fail_fast`).
    pub fn create_receipt(
        &self,
        before: &[u8],
        after: &[u8],
        replay_script: &str,
        agent_id: &str,
    ) -> Result<Receipt, ReceiptError> {
        self.create_receipt_with(before, after, replay_script, agent_id, ReceiptOptions::default())
    }

    pub fn create_receipt_with(
        &self,
        before: &[u8],
        after: &[u8],
        replay_script: &str,
        agent_id: &str,
        options: ReceiptOptions,
    ) -> Result<Receipt, ReceiptError> {
        if before.is_empty() {
            return Err(ReceiptError::EmptyInput("before state"));
        }
        if after.is_empty() {
            return Err(ReceiptError::EmptyInput("after state"));
        }
        if replay_script.is_empty() {
            return Err(ReceiptError::EmptyInput("replay script"));
        }
        if agent_id.is_empty() {
            return Err(ReceiptError::EmptyInput("agent ID"));
        }

        let receipt = Receipt {
            execution_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            timestamp: now_nanos(),
            toolchain_ver: self.config.toolchain_version.clone(),
            input_hash: sha256_hex(before),
            output_hash: sha256_hex(after),
            proof_artifacts: options.proof_artifacts,
            replay_script: replay_script.to_string(),
            composition_op: options.composition_op,
            conflict_policy: options.conflict_policy,
        };

        metrics::counter!("kgc_receipts_created_total").increment(1);
        tracing::debug!(
            execution_id = %receipt.execution_id,
            agent_id = %receipt.agent_id,
            "Receipt created"
        );
        Ok(receipt)
    }

    /// Structural check against the current wall clock.
    pub fn verify_receipt(&self, receipt: &Receipt) -> Result<(), ReceiptError> {
        self.verify_receipt_at(receipt, now_nanos())
    }

    /// Structural check against an explicit `now` (Unix nanoseconds).
    pub fn verify_receipt_at(&self, receipt: &Receipt, now: i64) -> Result<(), ReceiptError> {
        require("execution_id", &receipt.execution_id)?;
        require("agent_id", &receipt.agent_id)?;
        require("toolchain_ver", &receipt.toolchain_ver)?;
        require("input_hash", &receipt.input_hash)?;
        require("output_hash", &receipt.output_hash)?;
        require("replay_script", &receipt.replay_script)?;

        check_hash("input_hash", &receipt.input_hash)?;
        check_hash("output_hash", &receipt.output_hash)?;

        if receipt.timestamp > now {
            return Err(ReceiptError::FutureTimestamp {
                timestamp: receipt.timestamp,
                now,
            });
        }

        let max_age = self.config.max_age.num_nanoseconds().unwrap_or(i64::MAX);
        let oldest_allowed = now.saturating_sub(max_age);
        if receipt.timestamp < oldest_allowed {
            return Err(ReceiptError::StaleTimestamp {
                timestamp: receipt.timestamp,
                oldest_allowed,
            });
        }

        Ok(())
    }

    /// `first` must hand its output state to `second`, strictly earlier.
    pub fn chain_receipts(&self, first: &Receipt, second: &Receipt) -> Result<(), ReceiptError> {
        let now = now_nanos();
        self.verify_receipt_at(first, now).map_err(|e| ReceiptError::InvalidLink {
            position: 0,
            source: Box::new(e),
        })?;
        self.verify_receipt_at(second, now).map_err(|e| ReceiptError::InvalidLink {
            position: 1,
            source: Box::new(e),
        })?;
        link(first, second)
    }

    /// Every adjacent pair of `receipts` must chain.
    pub fn verify_chain(&self, receipts: &[Receipt]) -> Result<(), ReceiptError> {
        if receipts.is_empty() {
            return Err(ReceiptError::EmptyChain);
        }

        let now = now_nanos();
        for (position, receipt) in receipts.iter().enumerate() {
            self.verify_receipt_at(receipt, now).map_err(|e| ReceiptError::InvalidLink {
                position,
                source: Box::new(e),
            })?;
        }
        for pair in receipts.windows(2) {
            link(&pair[0], &pair[1])?;
        }
        Ok(())
    }

    /// Compact JSON in the pinned field order.
    pub fn serialize_receipt(receipt: &Receipt) -> Result<Vec<u8>, ReceiptError> {
        Ok(serde_json::to_vec(receipt)?)
    }

    pub fn deserialize_receipt(data: &[u8]) -> Result<Receipt, ReceiptError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// True when `receipt` no longer serializes to `original`. An empty
    /// `original` is a missing baseline, not evidence of tampering.
    pub fn detect_tamper(receipt: &Receipt, original: &[u8]) -> Result<bool, ReceiptError> {
        if original.is_empty() {
            return Err(ReceiptError::EmptyInput("original bytes"));
        }
        let current = Self::serialize_receipt(receipt)?;
        let tampered = sha256_hex(&current) != sha256_hex(original);

        if tampered {
            metrics::counter!("kgc_tamper_detected_total").increment(1);
            tracing::warn!(
                execution_id = %receipt.execution_id,
                agent_id = %receipt.agent_id,
                "Receipt does not match its original serialization"
            );
        }
        Ok(tampered)
    }

    /// Global receipt covering a set of per-agent receipts.
    ///
    /// Input and output hashes are order-independent digests of the
    /// sub-receipts' hashes, so the same set always composes identically.
    pub fn compose_global(&self, receipts: &[Receipt], agent_id: &str) -> Result<Receipt, ReceiptError> {
        if receipts.is_empty() {
            return Err(ReceiptError::EmptyInput("receipt set"));
        }
        if agent_id.is_empty() {
            return Err(ReceiptError::EmptyInput("agent ID"));
        }

        let now = now_nanos();
        for (position, receipt) in receipts.iter().enumerate() {
            self.verify_receipt_at(receipt, now).map_err(|e| ReceiptError::InvalidLink {
                position,
                source: Box::new(e),
            })?;
        }

        let mut executions: Vec<&str> = receipts.iter().map(|r| r.execution_id.as_str()).collect();
        executions.sort_unstable();

        let proof_artifacts = BTreeMap::from([
            (ARTIFACT_SUB_RECEIPTS.to_string(), receipts.len().to_string()),
            (ARTIFACT_EXECUTIONS.to_string(), executions.join(",")),
        ]);

        let receipt = Receipt {
            execution_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            // Strictly after every sub-receipt so the global one can chain onward.
            timestamp: now.max(receipts.iter().map(|r| r.timestamp).max().unwrap_or(now) + 1),
            toolchain_ver: self.config.toolchain_version.clone(),
            input_hash: combined_hash(receipts.iter().map(|r| r.input_hash.as_str())),
            output_hash: combined_hash(receipts.iter().map(|r| r.output_hash.as_str())),
            proof_artifacts,
            replay_script: format!("compose {} sub-receipts", receipts.len()),
            composition_op: CompositionOp::Merge,
            conflict_policy: ConflictPolicy::FailFast,
        };

        metrics::counter!("kgc_receipts_created_total").increment(1);
        tracing::debug!(
            execution_id = %receipt.execution_id,
            sub_receipts = receipts.len(),
            "Global receipt composed"
        );
        Ok(receipt)
    }
}

fn link(first: &Receipt, second: &Receipt) -> Result<(), ReceiptError> {
    if first.output_hash != second.input_hash {
        return Err(ReceiptError::ChainBroken {
            left: preview(&first.output_hash),
            right: preview(&second.input_hash),
        });
    }
    if first.timestamp >= second.timestamp {
        return Err(ReceiptError::TemporalViolation {
            first: first.timestamp,
            second: second.timestamp,
        });
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<(), ReceiptError> {
    if value.is_empty() {
        return Err(ReceiptError::MissingField(field));
    }
    Ok(())
}

fn check_hash(field: &'static str, value: &str) -> Result<(), ReceiptError> {
    if value.len() != SHA256_HEX_LEN {
        return Err(ReceiptError::InvalidHashLength {
            field,
            len: value.len(),
        });
    }
    if !is_lower_hex(value) {
        return Err(ReceiptError::InvalidHashEncoding(field));
    }
    Ok(())
}

fn preview(hash: &str) -> String {
    hash.get(..HASH_PREVIEW_LEN).unwrap_or(hash).to_string()
}

/// Current time in Unix nanoseconds.
pub fn now_nanos() -> i64 {
    // Out of range only after the year 2262.
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: i64 = 1_000_000_000;

    fn receipt_at(chain: &ReceiptChain, before: &[u8], after: &[u8], timestamp: i64) -> Receipt {
        let mut receipt = chain.create_receipt(before, after, "make build", "agent-1").unwrap();
        receipt.timestamp = timestamp;
        receipt
    }

    #[test]
    fn test_create_receipt_hashes_states() {
        let chain = ReceiptChain::default();
        let receipt = chain.create_receipt(b"before", b"after", "echo", "agent-1").unwrap();

        assert_eq!(receipt.input_hash, sha256_hex(b"before"));
        assert_eq!(receipt.output_hash, sha256_hex(b"after"));
        assert_eq!(receipt.composition_op, CompositionOp::Append);
        assert_eq!(receipt.conflict_policy, ConflictPolicy::FailFast);
        assert_eq!(receipt.toolchain_ver, DEFAULT_TOOLCHAIN_VERSION);
        assert!(Uuid::parse_str(&receipt.execution_id).is_ok());
        assert!(chain.verify_receipt(&receipt).is_ok());
    }

    #[test]
    fn test_create_receipt_rejects_empty_inputs() {
        let chain = ReceiptChain::default();
        assert!(matches!(
            chain.create_receipt(b"", b"after", "echo", "a"),
            Err(ReceiptError::EmptyInput(_))
        ));
        assert!(chain.create_receipt(b"before", b"", "echo", "a").is_err());
        assert!(chain.create_receipt(b"before", b"after", "", "a").is_err());
        assert!(chain.create_receipt(b"before", b"after", "echo", "").is_err());
    }

    #[test]
    fn test_options_override_composition() {
        let chain = ReceiptChain::default();
        let options = ReceiptOptions {
            composition_op: CompositionOp::Replace,
            conflict_policy: ConflictPolicy::Skip,
            ..Default::default()
        }
        .with_artifact("log", "ok");

        let receipt = chain
            .create_receipt_with(b"a", b"b", "echo", "agent-1", options)
            .unwrap();
        assert_eq!(receipt.composition_op, CompositionOp::Replace);
        assert_eq!(receipt.conflict_policy, ConflictPolicy::Skip);
        assert_eq!(receipt.proof_artifacts["log"], "ok");
    }

    #[test]
    fn test_verify_rejects_bad_hashes() {
        let chain = ReceiptChain::default();
        let mut receipt = chain.create_receipt(b"a", b"b", "echo", "agent-1").unwrap();

        receipt.input_hash = "abc".to_string();
        assert!(matches!(
            chain.verify_receipt(&receipt),
            Err(ReceiptError::InvalidHashLength { field: "input_hash", len: 3 })
        ));

        receipt.input_hash = receipt.output_hash.to_uppercase();
        assert!(matches!(
            chain.verify_receipt(&receipt),
            Err(ReceiptError::InvalidHashEncoding("input_hash"))
        ));

        receipt.input_hash = String::new();
        assert!(matches!(
            chain.verify_receipt(&receipt),
            Err(ReceiptError::MissingField("input_hash"))
        ));
    }

    #[test]
    fn test_verify_timestamp_window() {
        let chain = ReceiptChain::default();
        let now = 400 * 24 * 3600 * SECOND;
        let mut receipt = receipt_at(&chain, b"a", b"b", now);

        assert!(chain.verify_receipt_at(&receipt, now).is_ok());

        receipt.timestamp = now + 1;
        assert!(matches!(
            chain.verify_receipt_at(&receipt, now),
            Err(ReceiptError::FutureTimestamp { .. })
        ));

        receipt.timestamp = now - 366 * 24 * 3600 * SECOND;
        assert!(matches!(
            chain.verify_receipt_at(&receipt, now),
            Err(ReceiptError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn test_configured_max_age() {
        let chain = ReceiptChain::new(ReceiptChainConfig {
            toolchain_version: "rust-test".to_string(),
            max_age: Duration::days(1),
        });
        let now = 10 * 24 * 3600 * SECOND;
        let receipt = receipt_at(&chain, b"a", b"b", now - 2 * 24 * 3600 * SECOND);

        assert_eq!(receipt.toolchain_ver, "rust-test");
        assert!(matches!(
            chain.verify_receipt_at(&receipt, now),
            Err(ReceiptError::StaleTimestamp { .. })
        ));
    }

    #[test]
    fn test_chain_error_messages() {
        let chain = ReceiptChain::default();
        let now = now_nanos();
        let first = receipt_at(&chain, b"a", b"b", now - 10 * SECOND);
        let unrelated = receipt_at(&chain, b"x", b"y", now - 5 * SECOND);

        let err = chain.chain_receipts(&first, &unrelated).unwrap_err();
        assert!(err.to_string().starts_with("chain broken"));

        let early = receipt_at(&chain, b"b", b"c", now - 20 * SECOND);
        let err = chain.chain_receipts(&first, &early).unwrap_err();
        assert!(err.to_string().starts_with("temporal violation"));
    }

    #[test]
    fn test_chain_rejects_invalid_member() {
        let chain = ReceiptChain::default();
        let now = now_nanos();
        let first = receipt_at(&chain, b"a", b"b", now - 10 * SECOND);
        let mut second = receipt_at(&chain, b"b", b"c", now - 5 * SECOND);
        second.agent_id.clear();

        assert!(matches!(
            chain.chain_receipts(&first, &second),
            Err(ReceiptError::InvalidLink { position: 1, .. })
        ));
    }

    #[test]
    fn test_compose_global_is_order_independent() {
        let chain = ReceiptChain::default();
        let now = now_nanos();
        let r1 = receipt_at(&chain, b"a", b"b", now - 10 * SECOND);
        let r2 = receipt_at(&chain, b"c", b"d", now - 5 * SECOND);

        let forward = chain.compose_global(&[r1.clone(), r2.clone()], "coordinator").unwrap();
        let backward = chain.compose_global(&[r2, r1.clone()], "coordinator").unwrap();

        assert_eq!(forward.input_hash, backward.input_hash);
        assert_eq!(forward.output_hash, backward.output_hash);
        assert_eq!(forward.proof_artifacts, backward.proof_artifacts);
        assert_eq!(forward.proof_artifacts[ARTIFACT_SUB_RECEIPTS], "2");
        assert_eq!(forward.composition_op, CompositionOp::Merge);
        assert!(forward.timestamp > r1.timestamp);
        assert!(chain.verify_receipt(&forward).is_ok());
    }

    #[test]
    fn test_compose_global_rejects_empty_set() {
        let chain = ReceiptChain::default();
        assert!(matches!(
            chain.compose_global(&[], "coordinator"),
            Err(ReceiptError::EmptyInput(_))
        ));
    }
}
