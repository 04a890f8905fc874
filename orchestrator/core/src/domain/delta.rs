// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Deltas and Reconciliation Outcomes
//!
//! A [`Delta`] is one agent's proposed, file-scoped change-set together with
//! the receipt proving the work. Its file list is the unit of conflict
//! detection.
//!
//! Conflicts are routine, not exceptional: reconciliation returns a
//! [`Reconciliation`] that is either a merged delta or a [`ConflictReport`],
//! and only malformed input is an error.

use crate::domain::digest::combined_hash;
use crate::domain::path_normalizer::PathNormalizerError;
use crate::domain::receipt::Receipt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// ID given to the delta produced by a clean reconciliation.
pub const MERGED_DELTA_ID: &str = "merged-delta";

/// A proposed change-set from one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub id: String,
    pub files: Vec<String>,
    /// Absent on merged deltas.
    pub receipt: Option<Receipt>,
    pub checksum: String,
}

impl Delta {
    /// Build a delta, deriving its checksum from the file set.
    pub fn new(id: impl Into<String>, files: Vec<String>, receipt: Option<Receipt>) -> Self {
        let checksum = Self::compute_checksum(&files);
        Self {
            id: id.into(),
            files,
            receipt,
            checksum,
        }
    }

    /// SHA-256 over the sorted, de-duplicated file set joined by `|`.
    pub fn compute_checksum<S: AsRef<str>>(files: &[S]) -> String {
        let unique: BTreeSet<&str> = files.iter().map(AsRef::as_ref).collect();
        combined_hash(unique)
    }
}

/// One file claimed by more than one delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConflict {
    pub file: String,
    /// IDs of the deltas claiming `file`, sorted.
    pub claimants: Vec<String>,
}

impl fmt::Display for FileConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file conflict: {} (claimed by {})", self.file, self.claimants.join(", "))
    }
}

/// Result of reconciling deltas that overlap.
///
/// `has_conflicts` is true exactly when `conflicts` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    has_conflicts: bool,
    conflicts: Vec<FileConflict>,
    conflict_graph: BTreeMap<String, Vec<String>>,
}

impl ConflictReport {
    /// Build a report, sorting conflicts by file and deriving the conflict
    /// graph (delta ID → sorted IDs of deltas it collides with).
    pub fn new(mut conflicts: Vec<FileConflict>) -> Self {
        conflicts.sort_by(|a, b| a.file.cmp(&b.file));

        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for conflict in &conflicts {
            for claimant in &conflict.claimants {
                let peers = graph.entry(claimant.clone()).or_default();
                peers.extend(conflict.claimants.iter().filter(|c| *c != claimant).cloned());
            }
        }

        Self {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
            conflict_graph: graph
                .into_iter()
                .map(|(id, peers)| (id, peers.into_iter().collect()))
                .collect(),
        }
    }

    pub fn has_conflicts(&self) -> bool {
        self.has_conflicts
    }

    pub fn conflicts(&self) -> &[FileConflict] {
        &self.conflicts
    }

    /// Human-readable description per conflicting file.
    pub fn descriptions(&self) -> Vec<String> {
        self.conflicts.iter().map(ToString::to_string).collect()
    }

    pub fn conflict_graph(&self) -> &BTreeMap<String, Vec<String>> {
        &self.conflict_graph
    }

    /// Files involved in any conflict.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.conflicts.iter().map(|c| c.file.as_str())
    }
}

/// Outcome of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reconciliation {
    /// All deltas were disjoint and were unioned.
    Merged(Delta),
    /// At least one file was claimed twice; nothing was merged.
    Conflicted(ConflictReport),
}

impl Reconciliation {
    pub fn has_conflicts(&self) -> bool {
        matches!(self, Reconciliation::Conflicted(_))
    }

    pub fn merged(&self) -> Option<&Delta> {
        match self {
            Reconciliation::Merged(delta) => Some(delta),
            Reconciliation::Conflicted(_) => None,
        }
    }

    pub fn conflict_report(&self) -> Option<&ConflictReport> {
        match self {
            Reconciliation::Merged(_) => None,
            Reconciliation::Conflicted(report) => Some(report),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("delta {index} has an empty ID")]
    EmptyDeltaId { index: usize },

    #[error("duplicate delta ID: {0}")]
    DuplicateDeltaId(String),

    #[error("delta {delta_id} lists an invalid file: {source}")]
    InvalidPath {
        delta_id: String,
        source: PathNormalizerError,
    },

    #[error("operation cancelled before it started")]
    Cancelled,
}
