//! Model schema introspection: the single key property and declared property types.
//!
//! A model schema is an ordinary JSON Schema object carrying an extra top-level
//! `keys` array that names the identifying property:
//!
//! ```json
//! { "type": "object", "keys": ["id"], "properties": { "id": { "type": "integer" } } }
//! ```

use crate::error::SchemaError;
use serde_json::{Map, Value};

/// Type of a property usable as a path key. JSON Schema `number` and `integer` both map to `Integer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
        }
    }
}

/// Parsed model schema. Holds the raw document for body validation.
#[derive(Clone, Debug)]
pub struct ModelSchema {
    document: Value,
}

impl ModelSchema {
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(text).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        if !document.is_object() {
            return Err(SchemaError::NotAnObject);
        }
        Ok(ModelSchema { document })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.document.get("properties").and_then(Value::as_object)
    }

    /// Name of the single key property.
    pub fn key_name(&self) -> Result<&str, SchemaError> {
        let keys: Vec<&str> = self
            .document
            .get("keys")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let key = match keys.as_slice() {
            [] => return Err(SchemaError::MissingKeys),
            [key] => *key,
            many => return Err(SchemaError::MultipleKeys(many.len())),
        };
        let declared = self.properties().map(|p| p.contains_key(key)).unwrap_or(false);
        if !declared {
            return Err(SchemaError::KeyNotDeclared(key.to_string()));
        }
        Ok(key)
    }

    /// Declared type of `name`, restricted to the types a path parameter can carry.
    pub fn property_type(&self, name: &str) -> Result<PropertyType, SchemaError> {
        let property = self
            .properties()
            .and_then(|p| p.get(name))
            .ok_or_else(|| SchemaError::UndeclaredProperty(name.to_string()))?;
        let type_name = property.get("type").and_then(Value::as_str).unwrap_or("");
        match type_name {
            "string" => Ok(PropertyType::String),
            "number" | "integer" => Ok(PropertyType::Integer),
            other => Err(SchemaError::UnsupportedType {
                property: name.to_string(),
                type_name: other.to_string(),
            }),
        }
    }
}
