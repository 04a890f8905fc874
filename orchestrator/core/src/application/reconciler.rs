// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Delta Reconciler
//!
//! Combines the deltas of concurrently run agents under a fail-fast policy:
//! if any file is claimed by two deltas nothing is merged and a
//! [`ConflictReport`] names every contested file. Otherwise the file sets
//! are unioned into one merged delta.
//!
//! Results are deterministic and independent of input order: claims are
//! collected into ordered maps keyed by normalized path, so reconciling the
//! same deltas in any order yields byte-identical output.

use crate::domain::delta::{
    ConflictReport, Delta, FileConflict, ReconcileError, Reconciliation, MERGED_DELTA_ID,
};
use crate::domain::path_normalizer::PathNormalizer;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tokio_util::sync::CancellationToken;

pub trait Reconciler: Send + Sync {
    /// Merge `deltas`, or report every file claimed more than once.
    fn reconcile(
        &self,
        cancel: &CancellationToken,
        deltas: &[Delta],
    ) -> Result<Reconciliation, ReconcileError>;

    /// Pairwise check; the error names the first file of `a` also in `b`.
    fn validate_composition(&self, a: &Delta, b: &Delta) -> Result<(), FileConflict>;
}

#[derive(Default)]
pub struct DeltaReconciler {
    normalizer: PathNormalizer,
}

impl DeltaReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalizer(normalizer: PathNormalizer) -> Self {
        Self { normalizer }
    }

    /// Normalized path → IDs of the deltas claiming it.
    fn collect_claims(
        &self,
        deltas: &[Delta],
    ) -> Result<BTreeMap<String, BTreeSet<String>>, ReconcileError> {
        let mut ids = HashSet::with_capacity(deltas.len());
        for (index, delta) in deltas.iter().enumerate() {
            if delta.id.is_empty() {
                return Err(ReconcileError::EmptyDeltaId { index });
            }
            if !ids.insert(delta.id.as_str()) {
                return Err(ReconcileError::DuplicateDeltaId(delta.id.clone()));
            }
        }

        let mut claims: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for delta in deltas {
            for file in &delta.files {
                let path = self
                    .normalizer
                    .normalize(file)
                    .map_err(|source| ReconcileError::InvalidPath {
                        delta_id: delta.id.clone(),
                        source,
                    })?;
                claims.entry(path).or_default().insert(delta.id.clone());
            }
        }
        Ok(claims)
    }

    /// Normalized form, falling back to the raw path for unnormalizable input.
    fn normalized_or_raw(&self, path: &str) -> String {
        self.normalizer
            .normalize(path)
            .unwrap_or_else(|_| path.to_string())
    }
}

impl Reconciler for DeltaReconciler {
    fn reconcile(
        &self,
        cancel: &CancellationToken,
        deltas: &[Delta],
    ) -> Result<Reconciliation, ReconcileError> {
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let claims = self.collect_claims(deltas)?;

        let conflicts: Vec<FileConflict> = claims
            .iter()
            .filter(|(_, claimants)| claimants.len() > 1)
            .map(|(file, claimants)| FileConflict {
                file: file.clone(),
                claimants: claimants.iter().cloned().collect(),
            })
            .collect();

        if !conflicts.is_empty() {
            let report = ConflictReport::new(conflicts);
            metrics::counter!("kgc_reconciliations_total", "outcome" => "conflict").increment(1);
            tracing::warn!(
                deltas = deltas.len(),
                conflicts = report.conflicts().len(),
                files = ?report.files().collect::<Vec<_>>(),
                "Reconciliation found conflicting deltas"
            );
            return Ok(Reconciliation::Conflicted(report));
        }

        let merged = Delta::new(MERGED_DELTA_ID, claims.into_keys().collect(), None);
        metrics::counter!("kgc_reconciliations_total", "outcome" => "merged").increment(1);
        tracing::debug!(
            deltas = deltas.len(),
            files = merged.files.len(),
            checksum = %merged.checksum,
            "Deltas merged"
        );
        Ok(Reconciliation::Merged(merged))
    }

    fn validate_composition(&self, a: &Delta, b: &Delta) -> Result<(), FileConflict> {
        let theirs: HashSet<String> = b.files.iter().map(|f| self.normalized_or_raw(f)).collect();

        match a
            .files
            .iter()
            .map(|f| self.normalized_or_raw(f))
            .find(|f| theirs.contains(f))
        {
            Some(file) => {
                let mut claimants = vec![a.id.clone(), b.id.clone()];
                claimants.sort();
                Err(FileConflict { file, claimants })
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::path_normalizer::PathNormalizerError;

    fn delta(id: &str, files: &[&str]) -> Delta {
        Delta::new(id, files.iter().map(|f| f.to_string()).collect(), None)
    }

    fn reconcile(deltas: &[Delta]) -> Result<Reconciliation, ReconcileError> {
        DeltaReconciler::new().reconcile(&CancellationToken::new(), deltas)
    }

    #[test]
    fn test_empty_input_merges_to_empty_delta() {
        let result = reconcile(&[]).unwrap();
        let merged = result.merged().unwrap();
        assert_eq!(merged.id, MERGED_DELTA_ID);
        assert!(merged.files.is_empty());
        assert!(merged.receipt.is_none());
        assert_eq!(merged.checksum, Delta::compute_checksum::<String>(&[]));
    }

    #[test]
    fn test_normalized_paths_collide() {
        let result = reconcile(&[delta("d1", &["./src/a.rs"]), delta("d2", &["src//a.rs"])]).unwrap();
        let report = result.conflict_report().unwrap();
        assert_eq!(report.conflicts()[0].file, "src/a.rs");
    }

    #[test]
    fn test_same_delta_listing_file_twice_is_not_a_conflict() {
        let result = reconcile(&[delta("d1", &["a", "./a"]), delta("d2", &["b"])]).unwrap();
        assert_eq!(result.merged().unwrap().files, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_input_validation() {
        assert!(matches!(
            reconcile(&[delta("", &["a"])]),
            Err(ReconcileError::EmptyDeltaId { index: 0 })
        ));
        assert!(matches!(
            reconcile(&[delta("d1", &["a"]), delta("d1", &["b"])]),
            Err(ReconcileError::DuplicateDeltaId(id)) if id == "d1"
        ));
        assert!(matches!(
            reconcile(&[delta("d1", &["../etc/passwd"])]),
            Err(ReconcileError::InvalidPath { source: PathNormalizerError::PathTraversal(_), .. })
        ));
        assert!(matches!(
            reconcile(&[delta("d1", &[""])]),
            Err(ReconcileError::InvalidPath { source: PathNormalizerError::Empty, .. })
        ));
    }

    #[test]
    fn test_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            DeltaReconciler::new().reconcile(&cancel, &[]),
            Err(ReconcileError::Cancelled)
        ));
    }

    #[test]
    fn test_validate_composition() {
        let reconciler = DeltaReconciler::new();
        let a = delta("d1", &["x", "shared"]);
        let b = delta("d2", &["./shared"]);
        let c = delta("d3", &["y"]);

        let conflict = reconciler.validate_composition(&a, &b).unwrap_err();
        assert_eq!(conflict.file, "shared");
        assert_eq!(conflict.claimants, vec!["d1".to_string(), "d2".to_string()]);
        assert!(reconciler.validate_composition(&a, &c).is_ok());
    }
}
