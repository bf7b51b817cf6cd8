//! Input validation for observations and entity identifiers
//!
//! Observations are rejected, never silently repaired: a confidence outside
//! [0, 1] usually means an extraction bug upstream, and clamping it would
//! hide that. An opt-in clamp mode exists on the collector config for hosts
//! that prefer lenient intake; it logs every clamp.

use serde_json::Value;

use crate::constants::{
    MAX_ENTITY_KEY_LENGTH, MAX_ENTITY_TYPE_LENGTH, MAX_FIELD_NAME_LENGTH, MAX_VALUE_SIZE_BYTES,
};
use crate::errors::{CollectorError, Result};
use crate::observation::Observation;

/// Validate a field name
pub fn validate_field_name(field: &str) -> Result<()> {
    if field.trim().is_empty() {
        return Err(CollectorError::InvalidObservation {
            field: field.to_string(),
            reason: "field name cannot be empty".to_string(),
        });
    }

    if field.len() > MAX_FIELD_NAME_LENGTH {
        return Err(CollectorError::InvalidObservation {
            field: field.to_string(),
            reason: format!(
                "field name too long: {} chars (max: {})",
                field.len(),
                MAX_FIELD_NAME_LENGTH
            ),
        });
    }

    if field.chars().any(|c| c.is_control()) {
        return Err(CollectorError::InvalidObservation {
            field: field.to_string(),
            reason: "field name contains control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate a confidence score: finite and within [0.0, 1.0]
pub fn validate_confidence(confidence: f32) -> Result<()> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(CollectorError::ConfidenceOutOfRange {
            got: confidence as f64,
        });
    }
    Ok(())
}

/// Validate an observation value: must be a scalar of bounded size
pub fn validate_value(field: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        Value::String(s) => {
            if s.len() > MAX_VALUE_SIZE_BYTES {
                return Err(CollectorError::InvalidObservation {
                    field: field.to_string(),
                    reason: format!(
                        "value too large: {} bytes (max: {})",
                        s.len(),
                        MAX_VALUE_SIZE_BYTES
                    ),
                });
            }
            Ok(())
        }
        Value::Array(_) | Value::Object(_) => Err(CollectorError::InvalidObservation {
            field: field.to_string(),
            reason: "value must be a scalar (string, number, boolean or null)".to_string(),
        }),
    }
}

/// Validate a whole observation before it may enter a buffer
pub fn validate_observation(obs: &Observation) -> Result<()> {
    validate_field_name(&obs.field)?;
    validate_confidence(obs.confidence)?;
    validate_value(&obs.field, &obs.value)?;
    Ok(())
}

/// Validate an entity key (normalized natural key, e.g. "strathmore_university")
pub fn validate_entity_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CollectorError::InvalidEntityKey(
            "key cannot be empty".to_string(),
        ));
    }

    if key.len() > MAX_ENTITY_KEY_LENGTH {
        return Err(CollectorError::InvalidEntityKey(format!(
            "key too long: {} chars (max: {})",
            key.len(),
            MAX_ENTITY_KEY_LENGTH
        )));
    }

    if key.chars().any(|c| c.is_control()) {
        return Err(CollectorError::InvalidEntityKey(
            "key contains control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate an entity type name
pub fn validate_entity_type(entity_type: &str) -> Result<()> {
    if entity_type.trim().is_empty() {
        return Err(CollectorError::InvalidEntityType(
            "entity type cannot be empty".to_string(),
        ));
    }

    if entity_type.len() > MAX_ENTITY_TYPE_LENGTH {
        return Err(CollectorError::InvalidEntityType(format!(
            "entity type too long: {} chars (max: {})",
            entity_type.len(),
            MAX_ENTITY_TYPE_LENGTH
        )));
    }

    if !entity_type
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CollectorError::InvalidEntityType(
            "entity type contains invalid characters (allowed: alphanumeric, -, _)".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Source;
    use serde_json::json;

    #[test]
    fn test_valid_field_names() {
        assert!(validate_field_name("name").is_ok());
        assert!(validate_field_name("fees_min").is_ok());
        assert!(validate_field_name("minimum_grade").is_ok());
    }

    #[test]
    fn test_invalid_field_names() {
        assert!(validate_field_name("").is_err());
        assert!(validate_field_name("   ").is_err());
        assert!(validate_field_name(&"f".repeat(200)).is_err());
        assert!(validate_field_name("bad\x00field").is_err());
    }

    #[test]
    fn test_confidence_bounds() {
        assert!(validate_confidence(0.0).is_ok());
        assert!(validate_confidence(0.6).is_ok());
        assert!(validate_confidence(1.0).is_ok());
        assert!(validate_confidence(-0.01).is_err());
        assert!(validate_confidence(1.01).is_err());
        assert!(validate_confidence(f32::NAN).is_err());
        assert!(validate_confidence(f32::INFINITY).is_err());
    }

    #[test]
    fn test_scalar_values_accepted() {
        assert!(validate_value("f", &json!("text")).is_ok());
        assert!(validate_value("f", &json!(42)).is_ok());
        assert!(validate_value("f", &json!(3.25)).is_ok());
        assert!(validate_value("f", &json!(true)).is_ok());
        assert!(validate_value("f", &Value::Null).is_ok());
    }

    #[test]
    fn test_compound_values_rejected() {
        assert!(validate_value("f", &json!(["a", "b"])).is_err());
        assert!(validate_value("f", &json!({"nested": 1})).is_err());
    }

    #[test]
    fn test_oversized_string_rejected() {
        let big = "x".repeat(MAX_VALUE_SIZE_BYTES + 1);
        assert!(validate_value("f", &json!(big)).is_err());
    }

    #[test]
    fn test_observation_validation() {
        let good = Observation::new("name", json!("Strathmore"), 0.9, Source::UserStated);
        assert!(validate_observation(&good).is_ok());

        let bad = Observation::new("", json!("x"), 0.9, Source::UserStated);
        assert!(validate_observation(&bad).is_err());
    }

    #[test]
    fn test_entity_key() {
        assert!(validate_entity_key("strathmore_university").is_ok());
        assert!(validate_entity_key("uon:bsc-computer-science").is_ok());
        assert!(validate_entity_key("").is_err());
        assert!(validate_entity_key(&"k".repeat(300)).is_err());
    }

    #[test]
    fn test_entity_type() {
        assert!(validate_entity_type("institution").is_ok());
        assert!(validate_entity_type("programme").is_ok());
        assert!(validate_entity_type("").is_err());
        assert!(validate_entity_type("bad type").is_err());
    }
}
