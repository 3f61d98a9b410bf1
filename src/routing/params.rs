//! Path parameter extraction and coercion against the model schema.

use crate::error::{GatewayError, SchemaError};
use crate::routing::resolver::request_suffix;
use crate::routing::template::RouteTemplate;
use crate::schema::{ModelSchema, PropertyType};
use serde_json::Value;

/// A path parameter bound to a schema property. `raw` is the segment as it appeared in the request
/// path; `value` is decoded and coerced.
#[derive(Clone, Debug, PartialEq)]
pub struct PathParameter {
    pub key: String,
    pub raw: String,
    pub value: Value,
}

/// Extract the parameter declared by `method_template` from `request_path`.
/// Returns `None` when the template declares no parameter.
pub fn extract_parameter(
    request_path: &str,
    api_base_url: &str,
    method_template: &str,
    schema: &ModelSchema,
) -> Result<Option<PathParameter>, GatewayError> {
    let template = RouteTemplate::parse(method_template)?;
    let Some(key) = template.param_name() else {
        return Ok(None);
    };
    let raw = request_suffix(request_path, api_base_url)
        .and_then(|suffix| template.match_suffix(suffix))
        .and_then(|m| m.param_value)
        .ok_or_else(|| {
            GatewayError::Internal(format!(
                "path '{}' does not match method url '{}'",
                request_path, method_template
            ))
        })?;
    let decoded = urlencoding::decode(raw)
        .map_err(|_| GatewayError::Validation(format!("path parameter '{}' is not valid UTF-8", key)))?;
    let value = coerce(key, &decoded, schema)?;
    Ok(Some(PathParameter {
        key: key.to_string(),
        raw: raw.to_string(),
        value,
    }))
}

/// Convert a raw path segment to the JSON value the key property stores.
pub fn coerce(key: &str, raw: &str, schema: &ModelSchema) -> Result<Value, GatewayError> {
    let property_type = schema.property_type(key).map_err(|e| match e {
        SchemaError::UnsupportedType { type_name, .. } => GatewayError::UnsupportedKeyType(type_name),
        other => GatewayError::Schema(other),
    })?;
    match property_type {
        PropertyType::String => Ok(Value::String(raw.to_string())),
        PropertyType::Integer => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| GatewayError::TypeCoercion {
                key: key.to_string(),
                value: raw.to_string(),
                expected: PropertyType::Integer.as_str(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ModelSchema {
        ModelSchema::parse(
            r#"{
                "keys": ["id"],
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"},
                    "tags": {"type": "array"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn no_parameter_for_plain_templates() {
        assert_eq!(extract_parameter("/pets", "pets", "", &schema()).unwrap(), None);
        assert_eq!(extract_parameter("/pets/all", "pets", "/all", &schema()).unwrap(), None);
    }

    #[test]
    fn integer_parameter_is_parsed() {
        let p = extract_parameter("/pets/42", "pets", "/{id}", &schema()).unwrap().unwrap();
        assert_eq!(p.key, "id");
        assert_eq!(p.raw, "42");
        assert_eq!(p.value, Value::from(42));
    }

    #[test]
    fn string_parameter_after_literal() {
        let p = extract_parameter("/api/pets/by-name/rex", "api/pets", "/by-name/{name}", &schema())
            .unwrap()
            .unwrap();
        assert_eq!(p.key, "name");
        assert_eq!(p.value, Value::String("rex".into()));
    }

    #[test]
    fn parameter_is_percent_decoded() {
        let p = extract_parameter("/pets/by-name/a%20b%C3%A9", "pets", "/by-name/{name}", &schema())
            .unwrap()
            .unwrap();
        assert_eq!(p.raw, "a%20b%C3%A9");
        assert_eq!(p.value, Value::String("a bé".into()));
        // an encoded slash stays inside the segment
        let p = extract_parameter("/pets/by-name/a%2Fb", "pets", "/by-name/{name}", &schema())
            .unwrap()
            .unwrap();
        assert_eq!(p.value, Value::String("a/b".into()));
        assert!(matches!(
            extract_parameter("/pets/by-name/%FF", "pets", "/by-name/{name}", &schema()),
            Err(GatewayError::Validation(_))
        ));
    }

    #[test]
    fn coercion_failures() {
        assert!(matches!(
            extract_parameter("/pets/rex", "pets", "/{id}", &schema()),
            Err(GatewayError::TypeCoercion { .. })
        ));
        assert!(matches!(
            extract_parameter("/pets/a", "pets", "/{tags}", &schema()),
            Err(GatewayError::UnsupportedKeyType(t)) if t == "array"
        ));
        assert!(matches!(
            extract_parameter("/pets/a", "pets", "/{owner}", &schema()),
            Err(GatewayError::Schema(SchemaError::UndeclaredProperty(_)))
        ));
    }
}
