//! Store collaborator interface
//!
//! The store owns the physical schema: it maps an entity type to its table,
//! handles natural-key conflicts (upsert-on-name), and enforces its own
//! network timeouts. A timeout or any other failure surfaces as an ordinary
//! error; the collector retains the buffer and retries on the next flush.
//!
//! The trait is synchronous. Async hosts wrap a store behind a channel or
//! call `flush_ready` from a blocking task; the collector itself performs no
//! I/O outside the store call.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata attached to every upsert at flush time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushMetadata {
    /// Conversation session that produced the record, if any
    pub session_id: Option<String>,

    /// Average confidence of the flushed buffer
    pub confidence_score: f32,

    /// When the flush happened
    pub flushed_at: DateTime<Utc>,
}

/// Destination for completed records.
///
/// `upsert` returns the stored record's id on success. Implementations
/// deduplicate by natural key, so replaying the same record is safe.
pub trait Store: Send + Sync {
    fn upsert(
        &self,
        entity_type: &str,
        record: &Map<String, Value>,
        metadata: &FlushMetadata,
    ) -> anyhow::Result<String>;
}

/// In-process store keeping records in a map, keyed by entity type and the
/// record's natural key. Reference implementation for tests and embedders
/// running without a database.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), StoredRecord>>,
}

/// A record as persisted by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub record: Map<String, Value>,
    pub metadata: FlushMetadata,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Natural key for deduplication: the record's "name" field when present,
    /// otherwise the serialized record itself.
    fn natural_key(record: &Map<String, Value>) -> String {
        record
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| Value::Object(record.clone()).to_string())
    }

    /// Fetch a stored record by entity type and natural key
    pub fn get(&self, entity_type: &str, natural_key: &str) -> Option<StoredRecord> {
        self.records
            .lock()
            .get(&(entity_type.to_string(), natural_key.to_lowercase()))
            .cloned()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Store for MemoryStore {
    fn upsert(
        &self,
        entity_type: &str,
        record: &Map<String, Value>,
        metadata: &FlushMetadata,
    ) -> anyhow::Result<String> {
        let key = (entity_type.to_string(), Self::natural_key(record));
        let mut records = self.records.lock();

        // Upsert semantics: keep the existing id, replace the payload
        let id = records
            .get(&key)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        records.insert(
            key,
            StoredRecord {
                id: id.clone(),
                record: record.clone(),
                metadata: metadata.clone(),
            },
        );
        Ok(id)
    }
}
