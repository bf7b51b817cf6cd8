//! Fact-Collector Library
//!
//! Incremental fact-buffering and promotion engine for conversational data
//! extraction. Takes a stream of low-confidence, partial, possibly-conflicting
//! observations about real-world entities (institutions, academic programmes)
//! and turns them into complete, storage-ready records.
//!
//! # Key Features
//! - Per-entity buffers keyed by `(entity_type, natural key)`
//! - Confidence-based conflict resolution (higher wins, ties go to the newest)
//! - Tunable promotion thresholds (completeness + average confidence)
//! - Failure-isolated batch flushing: one failing entity never blocks the rest
//! - Read-only buffer introspection safe to surface in a UI
//!
//! # Ownership
//! The [`Collector`] exclusively owns every buffer's lifetime. A buffer is
//! created on the first observation for a previously unseen identity and
//! destroyed exactly when its record is successfully flushed to the
//! [`Store`], explicitly discarded, or swept as stale.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use fact_collector::{
//!     Collector, EntitySchema, FlushContext, MemoryStore, Observation, SchemaRegistry, Source,
//! };
//! use serde_json::json;
//!
//! let mut schemas = SchemaRegistry::new();
//! schemas.register(EntitySchema::new("institution", ["name", "location"]).unwrap());
//!
//! let store = Arc::new(MemoryStore::new());
//! let collector = Collector::with_defaults(schemas, store);
//!
//! let ready = collector
//!     .queue(
//!         "institution",
//!         "strathmore_university",
//!         Observation::new("name", json!("Strathmore University"), 0.95, Source::UserStated),
//!     )
//!     .unwrap();
//! assert!(!ready); // location still missing
//!
//! collector
//!     .queue(
//!         "institution",
//!         "strathmore_university",
//!         Observation::new("location", json!("Nairobi"), 0.8, Source::ModelInference),
//!     )
//!     .unwrap();
//!
//! let results = collector.flush_ready(&FlushContext::default());
//! assert!(results[0].is_stored());
//! ```

pub mod buffer;
pub mod collector;
pub mod config;
pub mod conflict;
pub mod constants;
pub mod errors;
pub mod observation;
pub mod promotion;
pub mod schema;
pub mod store;
pub mod validation;

pub use buffer::{BufferState, EntityBuffer};
pub use collector::{
    BufferKey, BufferStatus, Collector, CollectorStats, FlushContext, FlushOutcome, FlushResult,
};
pub use config::CollectorConfig;
pub use errors::{CollectorError, Result};
pub use observation::{Observation, Source};
pub use promotion::PromotionPolicy;
pub use schema::{EntitySchema, SchemaRegistry};
pub use store::{FlushMetadata, MemoryStore, Store, StoredRecord};

// Re-export dependencies to ensure tests use the same version
pub use chrono;
pub use serde_json;
