//! Observation: one atomic fact candidate about one entity
//!
//! Observations are produced upstream by an extractor watching conversation
//! turns. Each carries a confidence estimate and a provenance tag; the
//! collector decides which observation to retain per field and when the
//! accumulated set is worth persisting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provenance of an observation - a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Cross-checked against reference data already held by the system
    ReferenceVerified,
    /// Inferred by the language model from conversation context
    ModelInference,
    /// Stated directly by the user
    UserStated,
}

/// One extracted fact candidate about an entity field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Schema attribute name (e.g. "name", "fees_min")
    pub field: String,

    /// Scalar value: string, number, boolean or null.
    /// Arrays and objects are rejected at validation time.
    pub value: Value,

    /// Caller-supplied correctness estimate in [0.0, 1.0]
    pub confidence: f32,

    /// Provenance tag
    pub source: Source,

    /// When the observation was extracted
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Create an observation timestamped now
    pub fn new(field: impl Into<String>, value: Value, confidence: f32, source: Source) -> Self {
        Self {
            field: field.into(),
            value,
            confidence,
            source,
            observed_at: Utc::now(),
        }
    }
}
