// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Delta reconciliation command
//!
//! Reads a JSON array of deltas and reports whether they merge cleanly.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use kgc_core::application::{DeltaReconciler, Reconciler};
use kgc_core::domain::delta::{Delta, Reconciliation};

#[derive(Args)]
pub struct ReconcileCommand {
    /// JSON file holding an array of deltas
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

pub fn execute(command: ReconcileCommand) -> Result<()> {
    let deltas = read_deltas(&command.file)?;
    let outcome = DeltaReconciler::new()
        .reconcile(&CancellationToken::new(), &deltas)
        .context("Deltas could not be reconciled")?;

    if command.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("Reconciled {} deltas", deltas.len());
    match outcome {
        Reconciliation::Merged(merged) => {
            println!("{}", "✓ No conflicts".green());
            println!("  Files: {}", merged.files.len());
            for file in &merged.files {
                println!("    {}", file);
            }
            println!("  Checksum: {}", merged.checksum);
        }
        Reconciliation::Conflicted(report) => {
            println!(
                "{}",
                format!("✗ {} conflicting files", report.conflicts().len()).red()
            );
            for description in report.descriptions() {
                println!("  {}", description);
            }
            for (delta, peers) in report.conflict_graph() {
                println!("  {} ↔ {}", delta.bold(), peers.join(", "));
            }
        }
    }
    Ok(())
}

pub fn read_deltas(path: &Path) -> Result<Vec<Delta>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read deltas from {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("{:?} is not a JSON array of deltas", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_deltas_without_receipts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deltas.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "d1", "files": ["a", "b"], "receipt": null, "checksum": ""},
                {"id": "d2", "files": ["c"], "checksum": ""}
            ]"#,
        )
        .unwrap();

        let deltas = read_deltas(&path).unwrap();
        assert_eq!(deltas.len(), 2);
        assert!(deltas[1].receipt.is_none());
    }

    #[test]
    fn test_read_deltas_rejects_non_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deltas.json");
        std::fs::write(&path, r#"{"id": "d1"}"#).unwrap();
        assert!(read_deltas(&path).is_err());
    }
}
