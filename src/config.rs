//! Collector configuration
//!
//! Every threshold is a tunable with a documented default in `constants.rs`.
//! The struct deserializes from config files with per-field defaults so hosts
//! can override only what they care about.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_BUFFERS, DEFAULT_MIN_AVG_CONFIDENCE, DEFAULT_MIN_COMPLETENESS_PCT,
    DEFAULT_STALE_BUFFER_TTL_SECS,
};
use crate::promotion::PromotionPolicy;

/// Configuration for a collector instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Minimum completeness percentage for storage readiness (0.0 - 100.0)
    #[serde(default = "default_min_completeness_pct")]
    pub min_completeness_pct: f32,

    /// Minimum average confidence for storage readiness (0.0 - 1.0)
    #[serde(default = "default_min_avg_confidence")]
    pub min_avg_confidence: f32,

    /// Clamp out-of-range confidences into [0, 1] instead of rejecting.
    ///
    /// Off by default: an out-of-range confidence usually means an extractor
    /// bug, and rejection surfaces it. When enabled, every clamp is logged
    /// at warn level.
    #[serde(default)]
    pub clamp_out_of_range_confidence: bool,

    /// Age in seconds after which an unflushed, untouched buffer becomes
    /// eligible for `sweep_stale`. `None` disables the sweep.
    #[serde(default = "default_stale_buffer_ttl_secs")]
    pub stale_buffer_ttl_secs: Option<u64>,

    /// Maximum number of concurrent buffers; queueing a new entity beyond
    /// this cap is rejected
    #[serde(default = "default_max_buffers")]
    pub max_buffers: usize,
}

fn default_min_completeness_pct() -> f32 {
    DEFAULT_MIN_COMPLETENESS_PCT
}
fn default_min_avg_confidence() -> f32 {
    DEFAULT_MIN_AVG_CONFIDENCE
}
fn default_stale_buffer_ttl_secs() -> Option<u64> {
    Some(DEFAULT_STALE_BUFFER_TTL_SECS)
}
fn default_max_buffers() -> usize {
    DEFAULT_MAX_BUFFERS
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            min_completeness_pct: default_min_completeness_pct(),
            min_avg_confidence: default_min_avg_confidence(),
            clamp_out_of_range_confidence: false,
            stale_buffer_ttl_secs: default_stale_buffer_ttl_secs(),
            max_buffers: default_max_buffers(),
        }
    }
}

impl CollectorConfig {
    /// Promotion policy derived from the configured thresholds
    pub fn promotion_policy(&self) -> PromotionPolicy {
        PromotionPolicy {
            min_completeness_pct: self.min_completeness_pct,
            min_avg_confidence: self.min_avg_confidence,
        }
    }
}
