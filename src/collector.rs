//! Collector: orchestrates entity buffers and drives persistence
//!
//! One collector instance is explicitly constructed and owned by whatever
//! scope makes sense for the host (typically one per active conversation).
//! It owns the buffer map exclusively; no other component holds buffer
//! references across calls.
//!
//! # Flow
//! ```text
//! Extractor turn output
//!     │  queue(entity_type, key, observation)
//!     ▼
//! ┌──────────────────────────────────────────────────────┐
//! │  Collector                                           │
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────┐  │
//! │  │ validation │ → │ EntityBuffer │ → │ promotion  │  │
//! │  │ + schema   │   │ (conflict    │   │ policy     │  │
//! │  │ lookup     │   │  resolution) │   │ check      │  │
//! │  └────────────┘   └──────────────┘   └────────────┘  │
//! └──────────────────────────────────────────────────────┘
//!     │  flush_ready(ctx): ready buffers → Store.upsert, evict on success
//!     ▼
//! Store (upsert by natural key)
//! ```
//!
//! # Locking
//! A single mutex guards the buffer map. `queue` holds it only for in-memory
//! work. `flush_ready` snapshots ready records under the lock, releases it
//! for the store calls, then re-acquires it only to evict the entries that
//! stored successfully. A buffer mutated between snapshot and eviction is
//! retained and flushed again later; store upserts are replay-safe.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use chrono::{Duration, Utc};

use crate::buffer::{BufferState, EntityBuffer};
use crate::config::CollectorConfig;
use crate::errors::{CollectorError, Result};
use crate::observation::Observation;
use crate::promotion::PromotionPolicy;
use crate::schema::SchemaRegistry;
use crate::store::{FlushMetadata, Store};
use crate::validation::{validate_entity_key, validate_entity_type, validate_observation};

/// Composite buffer identity: entity type plus natural key.
///
/// Keying by the pair means an institution and a programme that happen to
/// normalize to the same key string never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferKey {
    pub entity_type: String,
    pub key: String,
}

/// Caller-supplied context for a flush pass
#[derive(Debug, Clone, Default)]
pub struct FlushContext {
    /// Conversation session driving the flush, recorded in store metadata
    pub session_id: Option<String>,
}

/// Outcome of one buffer's flush attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FlushOutcome {
    /// Stored successfully; the buffer was evicted
    Stored { id: String },
    /// Store failed; the buffer is retained and will be retried
    Failed { error: String },
}

/// Per-entity result of a `flush_ready` pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushResult {
    pub entity_type: String,
    pub key: String,
    pub outcome: FlushOutcome,
}

impl FlushResult {
    pub fn is_stored(&self) -> bool {
        matches!(self.outcome, FlushOutcome::Stored { .. })
    }
}

/// Read-only snapshot of one buffer, safe to display directly
/// (e.g. "Building profile for X: 70% complete, 2 fields missing")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStatus {
    pub entity_type: String,
    pub key: String,
    pub completeness_pct: f32,
    pub average_confidence: f32,
    pub state: BufferState,
    pub ready_for_storage: bool,
    pub missing_fields: Vec<String>,
}

/// Counters for collector activity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorStats {
    pub observations_accepted: u64,
    pub observations_rejected: u64,
    pub observations_clamped: u64,
    pub buffers_created: u64,
    pub records_flushed: u64,
    pub flush_failures: u64,
    pub buffers_discarded: u64,
}

struct Inner {
    buffers: HashMap<BufferKey, EntityBuffer>,
    stats: CollectorStats,
}

/// Orchestrator of per-entity observation buffers
pub struct Collector {
    config: CollectorConfig,
    policy: PromotionPolicy,
    schemas: SchemaRegistry,
    store: Arc<dyn Store>,
    inner: Mutex<Inner>,
}

impl Collector {
    pub fn new(config: CollectorConfig, schemas: SchemaRegistry, store: Arc<dyn Store>) -> Self {
        let policy = config.promotion_policy();
        Self {
            config,
            policy,
            schemas,
            store,
            inner: Mutex::new(Inner {
                buffers: HashMap::new(),
                stats: CollectorStats::default(),
            }),
        }
    }

    /// Collector with default configuration
    pub fn with_defaults(schemas: SchemaRegistry, store: Arc<dyn Store>) -> Self {
        Self::new(CollectorConfig::default(), schemas, store)
    }

    /// Queue one observation for an entity.
    ///
    /// Validates the observation, resolves the schema for `entity_type`
    /// (unknown types fail eagerly), routes to the buffer for the composite
    /// `(entity_type, key)` identity, and returns the buffer's readiness
    /// after the upsert. Queueing the identical observation twice is
    /// equivalent to queueing it once.
    pub fn queue(&self, entity_type: &str, key: &str, observation: Observation) -> Result<bool> {
        if let Err(err) = validate_entity_type(entity_type).and_then(|_| validate_entity_key(key)) {
            self.inner.lock().stats.observations_rejected += 1;
            return Err(err);
        }

        // Unknown entity type fails before any buffer is touched
        let schema = self.schemas.get(entity_type)?;

        let observation = match self.intake(observation) {
            Ok(obs) => obs,
            Err(err) => {
                self.inner.lock().stats.observations_rejected += 1;
                return Err(err);
            }
        };

        let buffer_key = BufferKey {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        };

        let mut inner = self.inner.lock();

        if !inner.buffers.contains_key(&buffer_key) {
            if inner.buffers.len() >= self.config.max_buffers {
                return Err(CollectorError::BufferLimitReached {
                    current: inner.buffers.len(),
                    limit: self.config.max_buffers,
                });
            }
            debug!(entity_type, key, "creating buffer");
            inner.stats.buffers_created += 1;
            inner
                .buffers
                .insert(buffer_key.clone(), EntityBuffer::new(key, schema));
        }

        let policy = self.policy;
        let buffer = inner
            .buffers
            .get_mut(&buffer_key)
            .expect("buffer inserted above");

        let was_ready = buffer.is_ready(&policy);
        buffer.upsert(observation);
        let ready = buffer.is_ready(&policy);

        if ready && !was_ready {
            debug!(
                entity_type,
                key,
                completeness_pct = buffer.completeness_pct(),
                avg_confidence = buffer.average_confidence(),
                "buffer promoted to ready"
            );
        }

        inner.stats.observations_accepted += 1;
        Ok(ready)
    }

    /// Queue a whole turn's worth of observations for one entity.
    ///
    /// Fails fast on the first invalid observation; previously queued
    /// observations from the batch remain buffered. Returns the buffer's
    /// readiness after the last upsert. An empty batch (a turn that
    /// extracted nothing) leaves the buffer untouched and reports its
    /// current readiness.
    pub fn queue_all(
        &self,
        entity_type: &str,
        key: &str,
        observations: Vec<Observation>,
    ) -> Result<bool> {
        if observations.is_empty() {
            return Ok(self.current_readiness(entity_type, key));
        }
        let mut ready = false;
        for observation in observations {
            ready = self.queue(entity_type, key, observation)?;
        }
        Ok(ready)
    }

    /// Flush every storage-ready buffer.
    ///
    /// Store calls run outside the lock. Each buffer's outcome is reported
    /// in the result list; a store failure for one entity never blocks the
    /// others and never evicts the failing buffer.
    pub fn flush_ready(&self, ctx: &FlushContext) -> Vec<FlushResult> {
        // Phase 1: snapshot ready buffers under the lock
        let snapshots: Vec<ReadySnapshot> = {
            let inner = self.inner.lock();
            inner
                .buffers
                .iter()
                .filter(|(_, buffer)| buffer.is_ready(&self.policy))
                .map(|(buffer_key, buffer)| ReadySnapshot {
                    buffer_key: buffer_key.clone(),
                    record: buffer.to_record(),
                    avg_confidence: buffer.average_confidence(),
                    version: buffer.version(),
                })
                .collect()
        };

        if snapshots.is_empty() {
            return Vec::new();
        }

        // Phase 2: store calls without holding the lock
        let flushed_at = Utc::now();
        let mut results = Vec::with_capacity(snapshots.len());
        let mut evict: Vec<(BufferKey, u64)> = Vec::new();

        for snapshot in snapshots {
            let metadata = FlushMetadata {
                session_id: ctx.session_id.clone(),
                confidence_score: snapshot.avg_confidence,
                flushed_at,
            };

            let outcome = match self.store.upsert(
                &snapshot.buffer_key.entity_type,
                &snapshot.record,
                &metadata,
            ) {
                Ok(id) => {
                    info!(
                        entity_type = %snapshot.buffer_key.entity_type,
                        key = %snapshot.buffer_key.key,
                        %id,
                        fields = snapshot.record.len(),
                        "flushed buffer to store"
                    );
                    evict.push((snapshot.buffer_key.clone(), snapshot.version));
                    FlushOutcome::Stored { id }
                }
                Err(err) => {
                    warn!(
                        entity_type = %snapshot.buffer_key.entity_type,
                        key = %snapshot.buffer_key.key,
                        error = %err,
                        "store upsert failed, buffer retained"
                    );
                    FlushOutcome::Failed {
                        error: err.to_string(),
                    }
                }
            };

            results.push(FlushResult {
                entity_type: snapshot.buffer_key.entity_type.clone(),
                key: snapshot.buffer_key.key.clone(),
                outcome,
            });
        }

        // Phase 3: evict stored buffers, unless they changed mid-flush
        {
            let mut inner = self.inner.lock();
            for (buffer_key, version) in evict {
                let unchanged = inner
                    .buffers
                    .get(&buffer_key)
                    .map(|b| b.version() == version)
                    .unwrap_or(false);
                if unchanged {
                    inner.buffers.remove(&buffer_key);
                } else {
                    debug!(
                        entity_type = %buffer_key.entity_type,
                        key = %buffer_key.key,
                        "buffer changed during flush, retained for next pass"
                    );
                }
                inner.stats.records_flushed += 1;
            }
            inner.stats.flush_failures += results.iter().filter(|r| !r.is_stored()).count() as u64;
        }

        results
    }

    /// Read-only snapshot of every buffer, sorted by entity type then key.
    /// Does not mutate state.
    pub fn buffer_status(&self) -> Vec<BufferStatus> {
        let inner = self.inner.lock();
        let mut statuses: Vec<BufferStatus> = inner
            .buffers
            .iter()
            .map(|(buffer_key, buffer)| BufferStatus {
                entity_type: buffer_key.entity_type.clone(),
                key: buffer_key.key.clone(),
                completeness_pct: buffer.completeness_pct(),
                average_confidence: buffer.average_confidence(),
                state: buffer.state(&self.policy),
                ready_for_storage: buffer.is_ready(&self.policy),
                missing_fields: buffer.missing_fields(),
            })
            .collect();
        statuses.sort_by(|a, b| {
            (a.entity_type.as_str(), a.key.as_str()).cmp(&(b.entity_type.as_str(), b.key.as_str()))
        });
        statuses
    }

    /// Drop a buffer without flushing it (e.g. session end).
    /// Returns true if a buffer existed for the identity.
    pub fn discard(&self, entity_type: &str, key: &str) -> bool {
        let buffer_key = BufferKey {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        };
        let mut inner = self.inner.lock();
        let removed = inner.buffers.remove(&buffer_key).is_some();
        if removed {
            inner.stats.buffers_discarded += 1;
            debug!(entity_type, key, "buffer discarded");
        }
        removed
    }

    /// Evict buffers untouched for longer than the configured TTL.
    /// Returns the number evicted. No-op when the TTL is disabled.
    pub fn sweep_stale(&self) -> usize {
        let Some(ttl_secs) = self.config.stale_buffer_ttl_secs else {
            return 0;
        };
        let cutoff = Utc::now() - Duration::seconds(ttl_secs as i64);

        let mut inner = self.inner.lock();
        let stale: Vec<BufferKey> = inner
            .buffers
            .iter()
            .filter(|(_, buffer)| buffer.last_updated < cutoff)
            .map(|(buffer_key, _)| buffer_key.clone())
            .collect();

        for buffer_key in &stale {
            warn!(
                entity_type = %buffer_key.entity_type,
                key = %buffer_key.key,
                "evicting stale unflushed buffer"
            );
            inner.buffers.remove(buffer_key);
        }
        inner.stats.buffers_discarded += stale.len() as u64;
        stale.len()
    }

    /// Activity counters
    pub fn stats(&self) -> CollectorStats {
        self.inner.lock().stats.clone()
    }

    /// Number of live buffers
    pub fn active_buffers(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    /// Current readiness of a buffer, false when none exists
    fn current_readiness(&self, entity_type: &str, key: &str) -> bool {
        let buffer_key = BufferKey {
            entity_type: entity_type.to_string(),
            key: key.to_string(),
        };
        self.inner
            .lock()
            .buffers
            .get(&buffer_key)
            .map(|buffer| buffer.is_ready(&self.policy))
            .unwrap_or(false)
    }

    /// Apply the confidence intake rule: reject out-of-range values, or
    /// clamp them when the config opts in (logged per clamp).
    fn intake(&self, mut observation: Observation) -> Result<Observation> {
        if self.config.clamp_out_of_range_confidence
            && observation.confidence.is_finite()
            && !(0.0..=1.0).contains(&observation.confidence)
        {
            let clamped = observation.confidence.clamp(0.0, 1.0);
            warn!(
                field = %observation.field,
                original = observation.confidence,
                clamped,
                "clamping out-of-range confidence"
            );
            observation.confidence = clamped;
            self.inner.lock().stats.observations_clamped += 1;
        }
        validate_observation(&observation)?;
        Ok(observation)
    }
}

struct ReadySnapshot {
    buffer_key: BufferKey,
    record: serde_json::Map<String, serde_json::Value>,
    avg_confidence: f32,
    version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Source;
    use crate::schema::EntitySchema;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let mut schemas = SchemaRegistry::new();
        schemas.register(EntitySchema::new("institution", ["name", "location"]).unwrap());
        schemas
    }

    fn collector() -> (Collector, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            Collector::with_defaults(registry(), store.clone()),
            store,
        )
    }

    fn obs(field: &str, value: serde_json::Value, confidence: f32) -> Observation {
        Observation::new(field, value, confidence, Source::ModelInference)
    }

    #[test]
    fn test_unknown_entity_type_rejected_eagerly() {
        let (collector, _) = collector();
        let err = collector
            .queue("scholarship", "k", obs("name", json!("x"), 0.9))
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_ENTITY_TYPE");
        assert_eq!(collector.active_buffers(), 0);
    }

    #[test]
    fn test_out_of_range_confidence_rejected_by_default() {
        let (collector, _) = collector();
        let err = collector
            .queue("institution", "k", obs("name", json!("x"), 1.5))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIDENCE_OUT_OF_RANGE");
        assert_eq!(collector.stats().observations_rejected, 1);
    }

    #[test]
    fn test_clamp_mode_accepts_and_counts() {
        let store = Arc::new(MemoryStore::new());
        let config = CollectorConfig {
            clamp_out_of_range_confidence: true,
            ..Default::default()
        };
        let collector = Collector::new(config, registry(), store);

        collector
            .queue("institution", "k", obs("name", json!("x"), 1.5))
            .unwrap();

        let stats = collector.stats();
        assert_eq!(stats.observations_clamped, 1);
        assert_eq!(stats.observations_accepted, 1);

        // NaN is still rejected even in clamp mode
        assert!(collector
            .queue("institution", "k", obs("name", json!("x"), f32::NAN))
            .is_err());
    }

    #[test]
    fn test_invalid_identity_counted_as_rejection() {
        let (collector, _) = collector();

        let err = collector
            .queue("institution", "", obs("name", json!("x"), 0.9))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ENTITY_KEY");

        let err = collector
            .queue("bad type", "k", obs("name", json!("x"), 0.9))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ENTITY_TYPE");

        // Identity rejections show up in stats just like observation ones
        assert_eq!(collector.stats().observations_rejected, 2);
    }

    #[test]
    fn test_queue_all_empty_batch_reports_current_readiness() {
        let (collector, _) = collector();

        // No buffer yet: an empty turn is not ready
        assert!(!collector.queue_all("institution", "k", vec![]).unwrap());

        collector
            .queue("institution", "k", obs("name", json!("x"), 0.9))
            .unwrap();
        collector
            .queue("institution", "k", obs("location", json!("y"), 0.9))
            .unwrap();

        // Buffer is ready; an empty turn must not hide that
        assert!(collector.queue_all("institution", "k", vec![]).unwrap());
        assert_eq!(collector.stats().observations_accepted, 2);
    }

    #[test]
    fn test_composite_key_no_cross_type_collision() {
        let store = Arc::new(MemoryStore::new());
        let mut schemas = registry();
        schemas.register(EntitySchema::new("programme", ["name", "duration"]).unwrap());
        let collector = Collector::with_defaults(schemas, store);

        collector
            .queue("institution", "nexus", obs("name", json!("Nexus"), 0.9))
            .unwrap();
        collector
            .queue("programme", "nexus", obs("name", json!("Nexus"), 0.9))
            .unwrap();

        assert_eq!(collector.active_buffers(), 2);
    }

    #[test]
    fn test_buffer_limit() {
        let store = Arc::new(MemoryStore::new());
        let config = CollectorConfig {
            max_buffers: 1,
            ..Default::default()
        };
        let collector = Collector::new(config, registry(), store);

        collector
            .queue("institution", "first", obs("name", json!("a"), 0.9))
            .unwrap();
        let err = collector
            .queue("institution", "second", obs("name", json!("b"), 0.9))
            .unwrap_err();
        assert_eq!(err.code(), "BUFFER_LIMIT_REACHED");

        // Existing buffers still accept observations at the cap
        assert!(collector
            .queue("institution", "first", obs("location", json!("x"), 0.9))
            .is_ok());
    }

    #[test]
    fn test_discard() {
        let (collector, store) = collector();
        collector
            .queue("institution", "k", obs("name", json!("x"), 0.9))
            .unwrap();

        assert!(collector.discard("institution", "k"));
        assert!(!collector.discard("institution", "k"));
        assert_eq!(collector.active_buffers(), 0);
        assert!(store.is_empty());
        assert_eq!(collector.stats().buffers_discarded, 1);
    }

    #[test]
    fn test_sweep_disabled() {
        let store = Arc::new(MemoryStore::new());
        let config = CollectorConfig {
            stale_buffer_ttl_secs: None,
            ..Default::default()
        };
        let collector = Collector::new(config, registry(), store);
        collector
            .queue("institution", "k", obs("name", json!("x"), 0.9))
            .unwrap();
        assert_eq!(collector.sweep_stale(), 0);
        assert_eq!(collector.active_buffers(), 1);
    }

    #[test]
    fn test_sweep_stale_evicts_old_buffers() {
        let store = Arc::new(MemoryStore::new());
        let config = CollectorConfig {
            stale_buffer_ttl_secs: Some(0),
            ..Default::default()
        };
        let collector = Collector::new(config, registry(), store);
        collector
            .queue("institution", "k", obs("name", json!("x"), 0.9))
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(collector.sweep_stale(), 1);
        assert_eq!(collector.active_buffers(), 0);
    }
}
