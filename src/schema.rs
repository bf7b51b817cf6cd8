//! Entity schemas and the registry that maps entity types to them
//!
//! A schema names the required fields for one entity type. Field order is
//! insertion order: it never affects completeness math, only the order of the
//! missing-fields report shown to callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{CollectorError, Result};
use crate::validation::{validate_entity_type, validate_field_name};

/// Required-field list for one entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Key identifying which buffers this schema governs (e.g. "institution")
    pub entity_type: String,

    /// Ordered, deduplicated field names
    pub required_fields: Vec<String>,
}

impl EntitySchema {
    /// Build a schema, validating the type name and field names and
    /// dropping duplicate fields while preserving first-seen order.
    pub fn new(
        entity_type: impl Into<String>,
        required_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let entity_type = entity_type.into();
        validate_entity_type(&entity_type)?;

        let mut fields: Vec<String> = Vec::new();
        for field in required_fields {
            let field = field.into();
            validate_field_name(&field)?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        if fields.is_empty() {
            return Err(CollectorError::EmptySchema(entity_type));
        }

        Ok(Self {
            entity_type,
            required_fields: fields,
        })
    }

    /// Number of required fields
    pub fn field_count(&self) -> usize {
        self.required_fields.len()
    }

    /// Whether a field participates in completeness for this type
    pub fn is_required(&self, field: &str) -> bool {
        self.required_fields.iter().any(|f| f == field)
    }
}

/// Registry of schemas keyed by entity type
///
/// Queueing an observation for a type with no registered schema is a
/// configuration error: completeness cannot be computed without one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous schema for the same type
    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas
            .insert(schema.entity_type.clone(), Arc::new(schema));
    }

    /// Look up the schema for an entity type
    pub fn get(&self, entity_type: &str) -> Result<Arc<EntitySchema>> {
        self.schemas
            .get(entity_type)
            .cloned()
            .ok_or_else(|| CollectorError::UnknownEntityType(entity_type.to_string()))
    }

    /// Registered entity types
    pub fn entity_types(&self) -> Vec<&str> {
        self.schemas.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
