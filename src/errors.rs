//! Structured error types for the collector pipeline
//!
//! Every failure mode degrades to "try again later": validation and
//! configuration errors are per-observation and skippable, store failures
//! are captured per-entity inside flush results and retried by virtue of
//! buffer retention. There is no fatal error class.

use std::fmt;

/// Collector error types with proper categorization
#[derive(Debug)]
pub enum CollectorError {
    // Validation errors - observation rejected before entering a buffer
    InvalidObservation { field: String, reason: String },
    ConfidenceOutOfRange { got: f64 },
    InvalidEntityKey(String),
    InvalidEntityType(String),

    // Configuration errors - raised eagerly at queue time
    UnknownEntityType(String),
    EmptySchema(String),

    // Resource limit - buffer map is at capacity
    BufferLimitReached { current: usize, limit: usize },

    // Storage errors - captured per-entity in FlushResult, never thrown
    // across the flush_ready boundary
    StoreFailure {
        entity_type: String,
        key: String,
        reason: String,
    },

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl CollectorError {
    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidObservation { .. } => "INVALID_OBSERVATION",
            Self::ConfidenceOutOfRange { .. } => "CONFIDENCE_OUT_OF_RANGE",
            Self::InvalidEntityKey(_) => "INVALID_ENTITY_KEY",
            Self::InvalidEntityType(_) => "INVALID_ENTITY_TYPE",
            Self::UnknownEntityType(_) => "UNKNOWN_ENTITY_TYPE",
            Self::EmptySchema(_) => "EMPTY_SCHEMA",
            Self::BufferLimitReached { .. } => "BUFFER_LIMIT_REACHED",
            Self::StoreFailure { .. } => "STORE_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors the caller should treat as bad input (log and skip)
    /// rather than a collector malfunction.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidObservation { .. }
                | Self::ConfidenceOutOfRange { .. }
                | Self::InvalidEntityKey(_)
                | Self::InvalidEntityType(_)
        )
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidObservation { field, reason } => {
                format!("Invalid observation for field '{field}': {reason}")
            }
            Self::ConfidenceOutOfRange { got } => {
                format!("Confidence must be a finite number in [0.0, 1.0], got: {got}")
            }
            Self::InvalidEntityKey(msg) => format!("Invalid entity key: {msg}"),
            Self::InvalidEntityType(msg) => format!("Invalid entity type: {msg}"),
            Self::UnknownEntityType(entity_type) => {
                format!("No schema registered for entity type '{entity_type}'")
            }
            Self::EmptySchema(entity_type) => {
                format!("Schema for entity type '{entity_type}' has no required fields")
            }
            Self::BufferLimitReached { current, limit } => {
                format!("Buffer limit reached: {current} active buffers (limit: {limit})")
            }
            Self::StoreFailure {
                entity_type,
                key,
                reason,
            } => {
                format!("Store upsert failed for {entity_type}/{key}: {reason}")
            }
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CollectorError {}

impl From<anyhow::Error> for CollectorError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Type alias for Results using CollectorError
pub type Result<T> = std::result::Result<T, CollectorError>;
