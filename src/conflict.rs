//! Conflict resolution between observations targeting the same field
//!
//! Pure function, no side effects: given the currently retained observation
//! (if any) and an incoming one, decide which to keep. Higher confidence
//! wins; an exact tie keeps the incoming observation (last-write-wins), which
//! makes re-queueing the identical observation idempotent.

use crate::observation::Observation;

/// Decide which observation to retain for a field.
///
/// Returns the incoming observation when there is no existing one, when the
/// incoming confidence is strictly higher, or when confidences tie exactly.
/// Otherwise the existing observation is kept.
pub fn resolve(existing: Option<&Observation>, incoming: Observation) -> Observation {
    match existing {
        None => incoming,
        Some(current) if incoming.confidence >= current.confidence => incoming,
        Some(current) => current.clone(),
    }
}
