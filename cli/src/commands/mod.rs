// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the kgc CLI

pub mod allocate;
pub mod config;
pub mod demo;
pub mod receipt;
pub mod reconcile;

pub use self::allocate::AllocateCommand;
pub use self::config::ConfigCommand;
pub use self::demo::DemoCommand;
pub use self::receipt::ReceiptCommand;
pub use self::reconcile::ReconcileCommand;
