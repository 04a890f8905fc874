// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Receipt commands
//!
//! Commands: create, verify, chain

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use kgc_core::application::{ReceiptChain, ReceiptChainConfig, ReceiptOptions};
use kgc_core::domain::receipt::Receipt;
use kgc_core::domain::substrate_config::SubstrateConfigManifest;

#[derive(Subcommand)]
pub enum ReceiptCommand {
    /// Create a receipt for a before/after state pair
    Create {
        /// File holding the state before the transformation
        #[arg(long, value_name = "FILE")]
        before: PathBuf,

        /// File holding the state after the transformation
        #[arg(long, value_name = "FILE")]
        after: PathBuf,

        /// How to reproduce the transformation
        #[arg(long)]
        script: String,

        /// Agent that performed the transformation
        #[arg(long)]
        agent: String,

        /// Write the receipt here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Verify a receipt's structure and, optionally, check it for tampering
    Verify {
        /// Receipt JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// The bytes originally issued for this receipt
        #[arg(long, value_name = "FILE")]
        original: Option<PathBuf>,
    },

    /// Verify that receipts form a chain, in the order given
    Chain {
        /// Receipt JSON files
        #[arg(value_name = "FILES", required = true, num_args = 2..)]
        files: Vec<PathBuf>,
    },
}

pub fn handle_command(command: ReceiptCommand, config: &SubstrateConfigManifest) -> Result<()> {
    let chain = ReceiptChain::new(ReceiptChainConfig::from(&config.spec.receipts));

    match command {
        ReceiptCommand::Create {
            before,
            after,
            script,
            agent,
            output,
        } => {
            let before = std::fs::read(&before).with_context(|| format!("Failed to read {:?}", before))?;
            let after = std::fs::read(&after).with_context(|| format!("Failed to read {:?}", after))?;
            let receipt = chain.create_receipt_with(
                &before,
                &after,
                &script,
                &agent,
                ReceiptOptions::from(&config.spec.receipts),
            )?;
            let bytes = ReceiptChain::serialize_receipt(&receipt)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write receipt to {:?}", path))?;
                    println!(
                        "{}",
                        format!("✓ Receipt {} written to {}", receipt.execution_id, path.display()).green()
                    );
                }
                None => println!("{}", String::from_utf8_lossy(&bytes)),
            }
            Ok(())
        }
        ReceiptCommand::Verify { file, original } => {
            let receipt = read_receipt(&file)?;
            chain
                .verify_receipt(&receipt)
                .with_context(|| format!("Receipt {} is invalid", receipt.execution_id))?;

            if let Some(original) = original {
                let bytes = std::fs::read(&original)
                    .with_context(|| format!("Failed to read {:?}", original))?;
                if ReceiptChain::detect_tamper(&receipt, &bytes)? {
                    anyhow::bail!("Receipt {} has been tampered with", receipt.execution_id);
                }
                println!("{}", "✓ Receipt matches its original bytes".green());
            }

            println!("{}", format!("✓ Receipt {} is valid", receipt.execution_id).green());
            println!("  Agent:  {}", receipt.agent_id);
            println!("  Input:  {}", receipt.input_hash);
            println!("  Output: {}", receipt.output_hash);
            Ok(())
        }
        ReceiptCommand::Chain { files } => {
            let receipts = files
                .iter()
                .map(|f| read_receipt(f))
                .collect::<Result<Vec<_>>>()?;

            match receipts.as_slice() {
                [first, second] => chain.chain_receipts(first, second)?,
                all => chain.verify_chain(all)?,
            }

            println!("{}", format!("✓ {} receipts form a valid chain", receipts.len()).green());
            Ok(())
        }
    }
}

fn read_receipt(path: &Path) -> Result<Receipt> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read receipt {:?}", path))?;
    ReceiptChain::deserialize_receipt(&bytes).with_context(|| format!("{:?} is not a receipt", path))
}
