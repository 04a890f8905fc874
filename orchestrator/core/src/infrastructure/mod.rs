// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod knowledge_store;

pub use knowledge_store::InMemoryKnowledgeStore;
