//! Request body validation against the model's JSON Schema.

use crate::error::{GatewayError, SchemaError};
use crate::schema::ModelSchema;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate `body` against `schema`. Every violation is reported, joined with "; ".
    pub fn validate(schema: &ModelSchema, body: &Value) -> Result<(), GatewayError> {
        if !body.is_object() {
            return Err(GatewayError::Validation("body must be a JSON object".into()));
        }
        let validator = jsonschema::validator_for(schema.document())
            .map_err(|e| GatewayError::Schema(SchemaError::Malformed(e.to_string())))?;
        let violations: Vec<String> = validator.iter_errors(body).map(|e| e.to_string()).collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Validation(violations.join("; ")))
        }
    }

    /// Parse a raw request body as JSON.
    pub fn parse_body(body: &[u8]) -> Result<Value, GatewayError> {
        if body.is_empty() {
            return Err(GatewayError::Validation("request body is empty".into()));
        }
        serde_json::from_slice(body).map_err(|e| GatewayError::Validation(format!("invalid request body: {}", e)))
    }
}
