//! Documented constants for the fact collector
//!
//! This module contains all tunable parameters with justification for their values.
//! Centralizing constants prevents magic numbers and makes tuning easier.

// =============================================================================
// PROMOTION THRESHOLDS
// A buffer is promoted to storage-ready when BOTH thresholds are met.
// =============================================================================

/// Minimum completeness percentage for storage readiness
///
/// A buffer becomes ready when at least this share of the schema's required
/// fields has a retained observation.
///
/// Justification:
/// - 70% tolerates fields the conversation never touches (e.g. a programme
///   discussed without fee details) while still producing a useful record
/// - Waiting for 100% means most entities never persist: conversations
///   rarely cover every attribute of an institution
/// - Below ~60% the record is too sparse to be worth an upsert round-trip
pub const DEFAULT_MIN_COMPLETENESS_PCT: f32 = 70.0;

/// Minimum average confidence for storage readiness
///
/// Mean confidence across all retained observations must reach this value.
///
/// Justification:
/// - 0.6 filters out buffers built purely from weak model inference
///   (typically scored 0.3-0.5) while accepting mixed provenance
/// - Reference-verified observations score 0.9+ and pull the mean up fast,
///   so a few verified fields compensate for several uncertain ones
/// - The threshold is inclusive: exactly 0.6 qualifies
pub const DEFAULT_MIN_AVG_CONFIDENCE: f32 = 0.6;

// =============================================================================
// VALIDATION LIMITS
// =============================================================================

/// Maximum length of a schema field name
pub const MAX_FIELD_NAME_LENGTH: usize = 128;

/// Maximum length of an entity key (normalized natural key)
pub const MAX_ENTITY_KEY_LENGTH: usize = 256;

/// Maximum length of an entity type name
pub const MAX_ENTITY_TYPE_LENGTH: usize = 64;

/// Maximum serialized size of a single observation value (bytes)
///
/// Justification:
/// - Observation values are scalars extracted from conversation text;
///   anything beyond a few KB indicates the extractor leaked a transcript
/// - 8KB leaves generous room for long institution descriptions
pub const MAX_VALUE_SIZE_BYTES: usize = 8 * 1024;

// =============================================================================
// LIFECYCLE DEFAULTS
// =============================================================================

/// Default TTL for unflushed buffers (seconds)
///
/// Buffers that have not been touched for this long are eligible for
/// `sweep_stale` eviction.
///
/// Justification:
/// - 1 hour comfortably outlives any single conversation session
/// - Prevents the unbounded-map growth of a process-lifetime singleton:
///   abandoned sessions eventually release their memory
pub const DEFAULT_STALE_BUFFER_TTL_SECS: u64 = 3600;

/// Default maximum number of concurrent buffers per collector
///
/// Justification:
/// - One collector serves one conversation (or a small shared pool);
///   a single session realistically discusses tens of entities, not thousands
/// - 1024 is a generous ceiling that still bounds worst-case memory at a few
///   MB of observations
pub const DEFAULT_MAX_BUFFERS: usize = 1024;
