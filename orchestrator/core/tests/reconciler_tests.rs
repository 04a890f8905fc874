// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for delta reconciliation.
//!
//! Exercises the composition laws: determinism, order independence for
//! disjoint deltas, and exact conflict reporting (no false negatives, no
//! false positives).

use kgc_core::application::{DeltaReconciler, ReceiptChain, Reconciler};
use kgc_core::domain::delta::{Delta, Reconciliation, MERGED_DELTA_ID};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

fn delta(id: &str, files: &[&str]) -> Delta {
    let receipt = ReceiptChain::default()
        .create_receipt(b"before", id.as_bytes(), "apply", id)
        .unwrap();
    Delta::new(id, files.iter().map(|f| f.to_string()).collect(), Some(receipt))
}

fn reconcile(deltas: &[Delta]) -> Reconciliation {
    DeltaReconciler::new()
        .reconcile(&CancellationToken::new(), deltas)
        .unwrap()
}

#[test]
fn test_disjoint_deltas_merge() {
    let result = reconcile(&[delta("d1", &["a", "b"]), delta("d2", &["c"])]);

    assert!(!result.has_conflicts());
    let merged = result.merged().unwrap();
    assert_eq!(merged.id, MERGED_DELTA_ID);
    assert_eq!(merged.files, vec!["a", "b", "c"]);
    assert_eq!(merged.checksum, Delta::compute_checksum(&["c", "b", "a"]));
    assert!(merged.receipt.is_none());
}

#[test]
fn test_shared_file_conflicts() {
    let result = reconcile(&[delta("d1", &["a"]), delta("d2", &["a"])]);

    assert!(result.has_conflicts());
    assert!(result.merged().is_none());
    let report = result.conflict_report().unwrap();
    assert!(report.has_conflicts());
    assert_eq!(report.conflicts().len(), 1);
    assert_eq!(report.conflicts()[0].file, "a");
    assert!(report.descriptions()[0].contains("a"));
}

#[test]
fn test_backslash_and_slash_paths_do_not_conflict() {
    let result = reconcile(&[delta("d1", &["dir\\file"]), delta("d2", &["dir/file"])]);

    assert!(!result.has_conflicts());
    assert_eq!(result.merged().unwrap().files.len(), 2);
}

#[test]
fn test_every_shared_file_is_reported_and_nothing_else() {
    let deltas = [
        delta("d1", &["a", "b", "x"]),
        delta("d2", &["b", "c", "y"]),
        delta("d3", &["c", "a", "z"]),
        delta("d4", &["w"]),
    ];
    let result = reconcile(&deltas);
    let report = result.conflict_report().unwrap();

    let reported: BTreeSet<&str> = report.files().collect();
    assert_eq!(reported, BTreeSet::from(["a", "b", "c"]));
    assert!(!report.conflict_graph().contains_key("d4"));
    assert_eq!(report.conflict_graph()["d1"], vec!["d2", "d3"]);
}

#[test]
fn test_reconcile_is_deterministic() {
    let deltas = [delta("d1", &["a"]), delta("d2", &["a", "b"]), delta("d3", &["b"])];
    assert_eq!(reconcile(&deltas), reconcile(&deltas));
}

#[test]
fn test_disjoint_merge_is_order_independent() {
    let a = delta("d1", &["src/a.rs", "src/b.rs"]);
    let b = delta("d2", &["docs/readme.md"]);
    let c = delta("d3", &["tests/t.rs"]);

    let forward = reconcile(&[a.clone(), b.clone(), c.clone()]);
    let backward = reconcile(&[c, a, b]);
    assert_eq!(forward, backward);
}

#[test]
fn test_incremental_validation_matches_full_reconcile() {
    let reconciler = DeltaReconciler::new();
    let accepted = delta("d1", &["a", "b"]);
    let clean = delta("d2", &["c"]);
    let dirty = delta("d3", &["z", "b"]);

    assert!(reconciler.validate_composition(&accepted, &clean).is_ok());
    let conflict = reconciler.validate_composition(&accepted, &dirty).unwrap_err();
    assert_eq!(conflict.file, "b");

    assert!(!reconcile(&[accepted.clone(), clean]).has_conflicts());
    assert!(reconcile(&[accepted, dirty]).has_conflicts());
}
