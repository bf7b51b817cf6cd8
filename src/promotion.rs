//! Promotion policy: when is a buffer complete enough to persist?
//!
//! Pure decision logic over two derived numbers, kept separate from the
//! buffer so the thresholds are tunable and the rule independently testable.
//! Both thresholds are inclusive: completeness exactly 70% with average
//! confidence exactly 0.6 is ready.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MIN_AVG_CONFIDENCE, DEFAULT_MIN_COMPLETENESS_PCT};

/// Thresholds governing buffer promotion to storage-ready
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PromotionPolicy {
    /// Minimum share of required fields observed, in percent
    pub min_completeness_pct: f32,

    /// Minimum arithmetic mean of retained confidences
    pub min_avg_confidence: f32,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self {
            min_completeness_pct: DEFAULT_MIN_COMPLETENESS_PCT,
            min_avg_confidence: DEFAULT_MIN_AVG_CONFIDENCE,
        }
    }
}

impl PromotionPolicy {
    /// Storage readiness for the given derived buffer metrics
    pub fn is_ready(&self, completeness_pct: f32, avg_confidence: f32) -> bool {
        completeness_pct >= self.min_completeness_pct && avg_confidence >= self.min_avg_confidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_inclusive() {
        let policy = PromotionPolicy::default();
        assert!(policy.is_ready(70.0, 0.6));
    }

    #[test]
    fn test_just_below_either_threshold_fails() {
        let policy = PromotionPolicy::default();
        assert!(!policy.is_ready(69.0, 0.6));
        assert!(!policy.is_ready(70.0, 0.59));
        assert!(!policy.is_ready(69.9, 0.59));
    }

    #[test]
    fn test_above_both_thresholds() {
        let policy = PromotionPolicy::default();
        assert!(policy.is_ready(87.5, 0.83));
        assert!(policy.is_ready(100.0, 1.0));
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = PromotionPolicy {
            min_completeness_pct: 100.0,
            min_avg_confidence: 0.9,
        };
        assert!(!strict.is_ready(87.5, 0.95));
        assert!(strict.is_ready(100.0, 0.9));
    }

    #[test]
    fn test_empty_buffer_never_ready() {
        let policy = PromotionPolicy::default();
        assert!(!policy.is_ready(0.0, 0.0));
    }
}
