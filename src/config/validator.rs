//! Definition validation: references, url templates, shape collisions, model schemas.

use crate::config::{normalize_base_url, DefinitionBundle, ModelDefinition};
use crate::error::DefinitionError;
use crate::routing::RouteTemplate;
use crate::schema::ModelSchema;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Printable ASCII, no spaces.
fn half_width() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[!-~]+$").expect("static regex"))
}

/// Fill in missing ids, upper-case verbs, trim base urls, then validate.
pub fn prepare_bundle(mut bundle: DefinitionBundle) -> Result<DefinitionBundle, DefinitionError> {
    let new_id = || uuid::Uuid::new_v4().to_string();
    for api in &mut bundle.apis {
        if api.id.is_empty() {
            api.id = new_id();
        }
        api.url = normalize_base_url(&api.url).to_string();
    }
    for method in &mut bundle.methods {
        if method.id.is_empty() {
            method.id = new_id();
        }
        method.verb = method.verb.trim().to_ascii_uppercase();
    }
    for model in &mut bundle.models {
        if model.id.is_empty() {
            model.id = new_id();
        }
    }
    validate_bundle(&bundle)?;
    Ok(bundle)
}

pub fn validate_bundle(bundle: &DefinitionBundle) -> Result<(), DefinitionError> {
    let mut api_ids = HashSet::new();
    let mut base_urls = HashSet::new();
    for api in &bundle.apis {
        let url = normalize_base_url(&api.url);
        if !half_width().is_match(url) {
            return Err(DefinitionError::InvalidBaseUrl(api.url.clone()));
        }
        if !base_urls.insert(url) {
            return Err(DefinitionError::DuplicateBaseUrl(api.url.clone()));
        }
        api_ids.insert(api.id.as_str());
    }

    let mut model_by_api: HashMap<&str, &ModelDefinition> = HashMap::new();
    let mut collections = HashSet::new();
    for model in &bundle.models {
        if !api_ids.contains(model.api_id.as_str()) {
            return Err(DefinitionError::MissingReference {
                kind: "api",
                id: model.api_id.clone(),
            });
        }
        if model.name.trim().is_empty() {
            return Err(DefinitionError::Validation(format!("model '{}' has no name", model.id)));
        }
        if !collections.insert(model.name.as_str()) {
            return Err(DefinitionError::DuplicateCollection(model.name.clone()));
        }
        if model_by_api.insert(model.api_id.as_str(), model).is_some() {
            return Err(DefinitionError::MultipleModels(model.api_id.clone()));
        }
        let schema_error = |source| DefinitionError::Schema {
            model: model.name.clone(),
            source,
        };
        let schema = ModelSchema::parse(&model.schema).map_err(schema_error)?;
        schema.key_name().map_err(schema_error)?;
    }

    // (api id, verb) -> [(shape, url)]
    let mut shapes: HashMap<(&str, &str), Vec<((usize, usize), &str)>> = HashMap::new();
    for method in &bundle.methods {
        if !api_ids.contains(method.api_id.as_str()) {
            return Err(DefinitionError::MissingReference {
                kind: "api",
                id: method.api_id.clone(),
            });
        }
        if axum::http::Method::from_bytes(method.verb.as_bytes()).is_err() {
            return Err(DefinitionError::InvalidVerb(method.verb.clone()));
        }
        let template = RouteTemplate::parse(&method.url)?;

        let same_verb = shapes.entry((method.api_id.as_str(), method.verb.as_str())).or_default();
        if let Some((_, existing)) = same_verb.iter().find(|(shape, _)| *shape == template.shape()) {
            return Err(DefinitionError::ShapeCollision {
                verb: method.verb.clone(),
                existing: existing.to_string(),
            });
        }
        same_verb.push((template.shape(), method.url.as_str()));

        if let Some(parameter) = template.param_name() {
            let invalid = |reason: String| DefinitionError::InvalidParameter {
                method: method.id.clone(),
                parameter: parameter.to_string(),
                reason,
            };
            let model = model_by_api
                .get(method.api_id.as_str())
                .ok_or_else(|| invalid("the api declares no model".into()))?;
            let schema = ModelSchema::parse(&model.schema).map_err(|e| invalid(e.to_string()))?;
            schema.property_type(parameter).map_err(|e| invalid(e.to_string()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiDefinition, MethodDefinition};

    const SCHEMA: &str = r#"{"keys": ["id"], "properties": {"id": {"type": "integer"}, "tags": {"type": "array"}}}"#;

    fn bundle() -> DefinitionBundle {
        DefinitionBundle {
            apis: vec![ApiDefinition {
                id: "pets".into(),
                name: "pets".into(),
                url: "/pets/".into(),
                ..Default::default()
            }],
            methods: vec![
                method("GET", ""),
                method("GET", "/{id}"),
                method("post", ""),
            ],
            models: vec![ModelDefinition {
                id: "pet".into(),
                api_id: "pets".into(),
                name: "pets".into(),
                schema: SCHEMA.into(),
                ..Default::default()
            }],
        }
    }

    fn method(verb: &str, url: &str) -> MethodDefinition {
        MethodDefinition {
            api_id: "pets".into(),
            verb: verb.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn prepares_valid_bundle() {
        let prepared = prepare_bundle(bundle()).unwrap();
        assert_eq!(prepared.apis[0].url, "pets");
        assert_eq!(prepared.methods[2].verb, "POST");
        assert!(prepared.methods.iter().all(|m| !m.id.is_empty()));
    }

    #[test]
    fn rejects_same_verb_and_shape() {
        let mut b = bundle();
        b.methods.push(method("GET", "/{name}"));
        assert!(matches!(
            prepare_bundle(b),
            Err(DefinitionError::ShapeCollision { ref existing, .. }) if existing == "/{id}"
        ));
        // a different verb with the same shape is fine
        let mut b = bundle();
        b.methods.push(method("DELETE", "/{id}"));
        prepare_bundle(b).unwrap();
    }

    #[test]
    fn rejects_bad_urls() {
        let mut b = bundle();
        b.apis[0].url = "my pets".into();
        assert!(matches!(prepare_bundle(b), Err(DefinitionError::InvalidBaseUrl(_))));
        let mut b = bundle();
        b.methods.push(method("PUT", "/{a}/{b}"));
        assert!(matches!(prepare_bundle(b), Err(DefinitionError::InvalidTemplate { .. })));
    }

    #[test]
    fn rejects_broken_models() {
        let mut b = bundle();
        b.models[0].schema = r#"{"keys": [], "properties": {}}"#.into();
        assert!(matches!(prepare_bundle(b), Err(DefinitionError::Schema { .. })));
        let mut b = bundle();
        let mut second = b.models[0].clone();
        second.id = "pet2".into();
        second.name = "pets2".into();
        b.models.push(second);
        assert!(matches!(prepare_bundle(b), Err(DefinitionError::MultipleModels(_))));
    }

    #[test]
    fn parameters_must_be_usable_keys() {
        let mut b = bundle();
        b.methods.push(method("DELETE", "/{tags}"));
        assert!(matches!(prepare_bundle(b), Err(DefinitionError::InvalidParameter { .. })));
        let mut b = bundle();
        b.methods.push(method("GET", "/by-owner/{owner}"));
        assert!(matches!(prepare_bundle(b), Err(DefinitionError::InvalidParameter { .. })));
    }

    #[test]
    fn rejects_unknown_api_references() {
        let mut b = bundle();
        b.methods[0].api_id = "ghost".into();
        assert!(matches!(
            prepare_bundle(b),
            Err(DefinitionError::MissingReference { kind: "api", .. })
        ));
    }
}
