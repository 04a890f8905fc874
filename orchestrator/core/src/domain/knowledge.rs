// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Knowledge Log Domain Types
//!
//! The append-only knowledge log shared by all agents:
//!
//! - [`Record`] - one immutable fact. Never mutated or removed once appended.
//! - [`Event`] - a replayable append, as produced by at-least-once delivery.
//! - [`SnapshotData`] - the canonical serialized view of a store.
//! - [`KnowledgeStore`] - the store contract, implemented by
//!   [`crate::infrastructure::knowledge_store::InMemoryKnowledgeStore`].
//!
//! ## Canonical Form
//!
//! Snapshots never depend on insertion order or map iteration order: records
//! are sorted by `(timestamp, id)` and every key/value mapping is a
//! `BTreeMap`, so identical logical state always serializes to identical
//! bytes.

use crate::domain::digest::{sha256_hex, sha256_hex_parts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// One immutable fact in the knowledge log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique within a store.
    pub id: String,
    /// Caller-supplied timestamp (Unix nanoseconds by convention).
    pub timestamp: i64,
    /// Opaque payload, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// Optional tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>, timestamp: i64, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a metadata tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// A record needs a non-empty ID and non-empty content.
    pub fn validate(&self) -> Result<(), KnowledgeError> {
        if self.id.is_empty() || self.content.is_empty() {
            return Err(KnowledgeError::InvalidRecord);
        }
        Ok(())
    }

    /// Deterministic hash of `id | timestamp | content`.
    pub fn hash(&self) -> String {
        let prefix = format!("{}|{}|", self.id, self.timestamp);
        sha256_hex_parts([prefix.as_bytes(), self.content.as_slice()])
    }
}

/// Kind of a replayable event. Only appends exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Append,
    /// Any event type this substrate does not understand.
    #[serde(other)]
    Unknown,
}

/// A replayable append operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub record: Record,
    pub timestamp: i64,
}

impl Event {
    /// Append event stamped with the record's own timestamp.
    pub fn append(record: Record) -> Self {
        Self {
            kind: EventKind::Append,
            timestamp: record.timestamp,
            record,
        }
    }
}

/// Canonical serialization of a store's state.
///
/// Field order here is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub records: Vec<Record>,
    pub metadata: BTreeMap<String, String>,
    pub version: u64,
}

impl SnapshotData {
    /// Build the canonical view: records sorted by `(timestamp, id)`.
    pub fn canonical(mut records: Vec<Record>, metadata: BTreeMap<String, String>, version: u64) -> Self {
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Self {
            records,
            metadata,
            version,
        }
    }

    /// Serialize (compact JSON) and hash.
    pub fn seal(&self) -> Result<Snapshot, KnowledgeError> {
        let data = serde_json::to_vec(self)?;
        let hash = sha256_hex(&data);
        Ok(Snapshot { hash, data })
    }
}

/// A sealed snapshot: serialized bytes and their SHA-256.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub hash: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("invalid record: ID and content are required")]
    InvalidRecord,

    #[error("record with ID '{0}' already exists")]
    DuplicateId(String),

    #[error("unknown event type at index {index}")]
    UnknownEventType { index: usize },

    #[error("replay failed during event processing: event {index}: {source}")]
    ReplayFailed {
        index: usize,
        source: Box<KnowledgeError>,
    },

    #[error("failed to canonicalize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation cancelled before it started")]
    Cancelled,
}

/// Append-only knowledge log with hash-stable snapshots.
///
/// Implementations guard their state with a single readers-writer lock:
/// `append` and `replay` write, everything else reads. Every operation takes
/// a cancellation token; a token that is already cancelled makes the call
/// return [`KnowledgeError::Cancelled`] without touching state.
pub trait KnowledgeStore: Send + Sync {
    /// Append a record and return its hash. Duplicate IDs are rejected and
    /// leave the store unchanged.
    fn append(&self, cancel: &CancellationToken, record: Record) -> Result<String, KnowledgeError>;

    /// Canonical point-in-time snapshot.
    fn snapshot(&self, cancel: &CancellationToken) -> Result<Snapshot, KnowledgeError>;

    /// True when the current snapshot hash equals `snapshot_hash`.
    fn verify(&self, cancel: &CancellationToken, snapshot_hash: &str) -> Result<bool, KnowledgeError>;

    /// Rebuild state from `events`, skipping duplicate IDs, and return the
    /// resulting snapshot hash.
    fn replay(&self, cancel: &CancellationToken, events: &[Event]) -> Result<String, KnowledgeError>;

    /// All records in append order.
    fn records(&self) -> Vec<Record>;

    fn get(&self, id: &str) -> Option<Record>;

    /// Monotonic counter advanced by every successful append.
    fn version(&self) -> u64;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set a store-level metadata entry. Included in snapshots; does not
    /// advance the version.
    fn set_metadata(&self, key: &str, value: &str);
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_validation() {
        assert!(Record::new("r1", 1, "data").validate().is_ok());
        assert!(matches!(Record::new("", 1, "data").validate(), Err(KnowledgeError::InvalidRecord)));
        assert!(matches!(Record::new("r1", 1, "").validate(), Err(KnowledgeError::InvalidRecord)));
    }

    #[test]
    fn test_record_hash_matches_pipe_format() {
        let record = Record::new("r1", 42, "payload");
        assert_eq!(record.hash(), sha256_hex(b"r1|42|payload"));
    }

    #[test]
    fn test_record_hash_ignores_metadata() {
        let plain = Record::new("r1", 42, "payload");
        let tagged = plain.clone().with_tag("source", "agent-1");
        assert_eq!(plain.hash(), tagged.hash());
    }

    #[test]
    fn test_record_content_is_base64_on_the_wire() {
        let record = Record::new("r1", 7, "hi");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":"r1","timestamp":7,"content":"aGk="}"#);

        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_event_type_wire_name() {
        let event = Event::append(Record::new("r1", 7, "hi"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "append");
        assert_eq!(json["timestamp"], 7);
    }

    #[test]
    fn test_unknown_event_type_deserializes() {
        let json = r#"{"type":"delete","record":{"id":"r1","timestamp":1,"content":"aGk="},"timestamp":1}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
    }

    #[test]
    fn test_canonical_snapshot_ignores_insertion_order() {
        let a = Record::new("a", 2, "x");
        let b = Record::new("b", 1, "y");
        let c = Record::new("c", 2, "z");

        let first = SnapshotData::canonical(vec![a.clone(), b.clone(), c.clone()], BTreeMap::new(), 3);
        let second = SnapshotData::canonical(vec![c, a, b], BTreeMap::new(), 3);

        assert_eq!(first, second);
        assert_eq!(first.records[0].id, "b");
        assert_eq!(first.records[1].id, "a");
        assert_eq!(first.seal().unwrap(), second.seal().unwrap());
    }
}
