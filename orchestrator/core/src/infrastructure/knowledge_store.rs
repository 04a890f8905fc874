// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-Memory Knowledge Store
//!
//! The only component of the substrate with shared mutable state. One
//! readers-writer lock, owned by the store instance, guards the whole log:
//! `append`, `replay` and `set_metadata` take it exclusively, everything else
//! shares it.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Append-only knowledge log with canonical snapshots
//! - **Pattern:** Repository (DDD), in-memory adapter
//!
//! # Duplicate IDs
//!
//! `append` rejects a duplicate ID and leaves the log unchanged. `replay`
//! skips it instead, because event streams from at-least-once delivery
//! legitimately repeat appends. Both paths converge on the same record set.

use crate::domain::knowledge::{
    Event, EventKind, KnowledgeError, KnowledgeStore, Record, Snapshot, SnapshotData,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct StoreState {
    /// Append order.
    records: Vec<Record>,
    /// Record ID → position in `records`.
    index: HashMap<String, usize>,
    metadata: BTreeMap<String, String>,
    version: u64,
}

impl StoreState {
    fn with_metadata(metadata: BTreeMap<String, String>) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    fn insert(&mut self, record: Record) -> Result<String, KnowledgeError> {
        record.validate()?;
        if self.index.contains_key(&record.id) {
            return Err(KnowledgeError::DuplicateId(record.id));
        }

        let hash = record.hash();
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        self.version += 1;
        Ok(hash)
    }

    fn snapshot(&self) -> Result<Snapshot, KnowledgeError> {
        SnapshotData::canonical(self.records.clone(), self.metadata.clone(), self.version).seal()
    }
}

/// Thread-safe, in-memory [`KnowledgeStore`].
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    state: RwLock<StoreState>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with store-level metadata.
    pub fn with_metadata(metadata: BTreeMap<String, String>) -> Self {
        Self {
            state: RwLock::new(StoreState::with_metadata(metadata)),
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), KnowledgeError> {
    if cancel.is_cancelled() {
        return Err(KnowledgeError::Cancelled);
    }
    Ok(())
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn append(&self, cancel: &CancellationToken, record: Record) -> Result<String, KnowledgeError> {
        ensure_active(cancel)?;

        let id = record.id.clone();
        let result = self.state.write().insert(record);

        match &result {
            Ok(hash) => {
                metrics::counter!("kgc_knowledge_appends_total", "outcome" => "ok").increment(1);
                tracing::debug!(record_id = %id, hash = %hash, "Record appended");
            }
            Err(KnowledgeError::DuplicateId(_)) => {
                metrics::counter!("kgc_knowledge_appends_total", "outcome" => "duplicate").increment(1);
                tracing::warn!(record_id = %id, "Rejected append of duplicate record ID");
            }
            Err(e) => {
                metrics::counter!("kgc_knowledge_appends_total", "outcome" => "invalid").increment(1);
                tracing::warn!(record_id = %id, error = %e, "Rejected invalid record");
            }
        }
        result
    }

    fn snapshot(&self, cancel: &CancellationToken) -> Result<Snapshot, KnowledgeError> {
        ensure_active(cancel)?;
        self.state.read().snapshot()
    }

    fn verify(&self, cancel: &CancellationToken, snapshot_hash: &str) -> Result<bool, KnowledgeError> {
        let current = self.snapshot(cancel)?;
        Ok(current.hash == snapshot_hash)
    }

    fn replay(&self, cancel: &CancellationToken, events: &[Event]) -> Result<String, KnowledgeError> {
        ensure_active(cancel)?;

        let mut state = self.state.write();
        // The replayed state is a function of the events alone.
        let mut fresh = StoreState::default();
        let mut skipped = 0usize;

        for (index, event) in events.iter().enumerate() {
            if event.kind == EventKind::Unknown {
                return Err(KnowledgeError::UnknownEventType { index });
            }
            match fresh.insert(event.record.clone()) {
                Ok(_) => {}
                Err(KnowledgeError::DuplicateId(id)) => {
                    skipped += 1;
                    tracing::debug!(record_id = %id, index, "Skipping duplicate record during replay");
                }
                Err(e) => {
                    return Err(KnowledgeError::ReplayFailed {
                        index,
                        source: Box::new(e),
                    });
                }
            }
        }

        let snapshot = fresh.snapshot()?;
        *state = fresh;

        tracing::info!(
            events = events.len(),
            skipped,
            hash = %snapshot.hash,
            "Knowledge store rebuilt from events"
        );
        Ok(snapshot.hash)
    }

    fn records(&self) -> Vec<Record> {
        self.state.read().records.clone()
    }

    fn get(&self, id: &str) -> Option<Record> {
        let state = self.state.read();
        state.index.get(id).map(|&pos| state.records[pos].clone())
    }

    fn version(&self) -> u64 {
        self.state.read().version
    }

    fn len(&self) -> usize {
        self.state.read().records.len()
    }

    fn set_metadata(&self, key: &str, value: &str) {
        self.state
            .write()
            .metadata
            .insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_record_hash() {
        let store = InMemoryKnowledgeStore::new();
        let cancel = CancellationToken::new();
        let record = Record::new("r1", 1, "hello");

        let hash = store.append(&cancel, record.clone()).unwrap();
        assert_eq!(hash, record.hash());
        assert_eq!(store.version(), 1);
        assert_eq!(store.get("r1"), Some(record));
    }

    #[test]
    fn test_invalid_record_leaves_store_unchanged() {
        let store = InMemoryKnowledgeStore::new();
        let cancel = CancellationToken::new();

        assert!(matches!(
            store.append(&cancel, Record::new("", 1, "x")),
            Err(KnowledgeError::InvalidRecord)
        ));
        assert!(store.is_empty());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_cancelled_token_rejects_before_touching_state() {
        let store = InMemoryKnowledgeStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            store.append(&cancel, Record::new("r1", 1, "x")),
            Err(KnowledgeError::Cancelled)
        ));
        assert!(matches!(store.snapshot(&cancel), Err(KnowledgeError::Cancelled)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_metadata_changes_snapshot_but_not_version() {
        let store = InMemoryKnowledgeStore::new();
        let cancel = CancellationToken::new();
        let before = store.snapshot(&cancel).unwrap();

        store.set_metadata("owner", "swarm");
        let after = store.snapshot(&cancel).unwrap();

        assert_ne!(before.hash, after.hash);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_replay_discards_store_metadata() {
        let store = InMemoryKnowledgeStore::with_metadata(BTreeMap::from([(
            "env".to_string(),
            "test".to_string(),
        )]));
        let cancel = CancellationToken::new();

        store
            .replay(&cancel, &[Event::append(Record::new("r1", 1, "x"))])
            .unwrap();

        let snapshot = store.snapshot(&cancel).unwrap();
        let data: SnapshotData = serde_json::from_slice(&snapshot.data).unwrap();
        assert!(data.metadata.is_empty());
        assert_eq!(data.version, 1);
    }

    #[test]
    fn test_replay_hash_does_not_depend_on_receiver() {
        let cancel = CancellationToken::new();
        let events = [Event::append(Record::new("r1", 1, "x"))];

        let plain = InMemoryKnowledgeStore::new();
        let tagged = InMemoryKnowledgeStore::with_metadata(BTreeMap::from([(
            "env".to_string(),
            "prod".to_string(),
        )]));

        let left = plain.replay(&cancel, &events).unwrap();
        let right = tagged.replay(&cancel, &events).unwrap();
        assert_eq!(left, right);
        assert!(tagged.verify(&cancel, &left).unwrap());
    }
}
