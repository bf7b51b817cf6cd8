//! EntityBuffer: per-entity accumulator of observations
//!
//! One buffer holds the currently retained observation for each field of one
//! real-world entity, plus the derived completeness and readiness state. The
//! collector exclusively owns every buffer's lifetime: a buffer exists from
//! the first observation for its key until a successful flush or an explicit
//! discard.
//!
//! State machine: `Empty -> Accumulating -> Ready -> flushed (evicted)`.
//! Ready is not terminal - a later upsert can in principle drop completeness
//! or confidence back below threshold, and the derived state follows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::conflict;
use crate::observation::Observation;
use crate::promotion::PromotionPolicy;
use crate::schema::EntitySchema;

/// Externally observable buffer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    Empty,
    Accumulating,
    Ready,
}

/// Accumulator of observations for one entity
#[derive(Debug, Clone)]
pub struct EntityBuffer {
    /// Natural identity the observations accumulate under
    pub key: String,

    /// Schema governing completeness for this buffer
    schema: Arc<EntitySchema>,

    /// At most one retained observation per field
    observations: HashMap<String, Observation>,

    /// Creation time, used by the stale sweep
    pub created_at: DateTime<Utc>,

    /// Last mutation time, used by the stale sweep
    pub last_updated: DateTime<Utc>,

    /// Monotonic mutation counter, bumped on every upsert. The flush path
    /// compares versions instead of timestamps so two mutations landing on
    /// the same clock instant cannot mask each other.
    version: u64,
}

impl EntityBuffer {
    pub fn new(key: impl Into<String>, schema: Arc<EntitySchema>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            schema,
            observations: HashMap::new(),
            created_at: now,
            last_updated: now,
            version: 0,
        }
    }

    /// Entity type this buffer belongs to
    pub fn entity_type(&self) -> &str {
        &self.schema.entity_type
    }

    /// Insert or replace the observation for a field via conflict resolution.
    ///
    /// Returns true if the retained observation for the field changed.
    pub fn upsert(&mut self, incoming: Observation) -> bool {
        let field = incoming.field.clone();
        let existing = self.observations.get(&field).cloned();

        let retained = conflict::resolve(existing.as_ref(), incoming);
        let changed = existing.as_ref() != Some(&retained);

        self.observations.insert(field, retained);
        self.last_updated = Utc::now();
        self.version += 1;
        changed
    }

    /// Mutation counter for snapshot-consistency checks
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of retained observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Share of the schema's required fields with a retained observation,
    /// in percent. Fields outside the schema are retained in the record but
    /// do not count toward completeness.
    pub fn completeness_pct(&self) -> f32 {
        let required = self.schema.field_count();
        if required == 0 {
            return 0.0;
        }
        let observed = self
            .schema
            .required_fields
            .iter()
            .filter(|f| self.observations.contains_key(f.as_str()))
            .count();
        100.0 * observed as f32 / required as f32
    }

    /// Arithmetic mean of retained confidences; 0.0 when empty.
    ///
    /// Accumulates in f64 so that a buffer of identical confidences averages
    /// back to exactly that confidence (f32 summation can land one ulp below
    /// the promotion threshold).
    pub fn average_confidence(&self) -> f32 {
        if self.observations.is_empty() {
            return 0.0;
        }
        let total: f64 = self.observations.values().map(|o| o.confidence as f64).sum();
        (total / self.observations.len() as f64) as f32
    }

    /// Required fields not yet observed, in schema order
    pub fn missing_fields(&self) -> Vec<String> {
        self.schema
            .required_fields
            .iter()
            .filter(|f| !self.observations.contains_key(f.as_str()))
            .cloned()
            .collect()
    }

    /// Storage readiness under the given policy
    pub fn is_ready(&self, policy: &PromotionPolicy) -> bool {
        policy.is_ready(self.completeness_pct(), self.average_confidence())
    }

    /// Derived lifecycle state
    pub fn state(&self, policy: &PromotionPolicy) -> BufferState {
        if self.observations.is_empty() {
            BufferState::Empty
        } else if self.is_ready(policy) {
            BufferState::Ready
        } else {
            BufferState::Accumulating
        }
    }

    /// Flatten to a plain field -> value record for the store, dropping
    /// confidence, source and timestamp metadata.
    pub fn to_record(&self) -> Map<String, Value> {
        self.observations
            .iter()
            .map(|(field, obs)| (field.clone(), obs.value.clone()))
            .collect()
    }

    /// Read access to the retained observation for a field
    pub fn get(&self, field: &str) -> Option<&Observation> {
        self.observations.get(field)
    }
}
