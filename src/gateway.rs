//! Request orchestration: API, model, method, path parameter, then document dispatch.
//!
//! Every request re-reads its definitions; nothing is cached between requests. The first failing
//! stage decides the response.

use crate::config::{MethodDefinition, ModelDefinition};
use crate::error::GatewayError;
use crate::response::GatewayResponse;
use crate::routing::{extract_parameter, request_suffix, RouteResolver};
use crate::schema::ModelSchema;
use crate::service::{DocumentExecutor, RequestValidator};
use crate::store::{DefinitionStore, DocumentFilter, DocumentStore, ModelCatalog};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// `DELETE <base url>/remove-target-collection` drops the API's document collection.
pub const REMOVE_COLLECTION_SEGMENT: &str = "remove-target-collection";

pub struct Gateway {
    definitions: Arc<dyn DefinitionStore>,
    models: Arc<dyn ModelCatalog>,
    resolver: RouteResolver,
    executor: DocumentExecutor,
}

impl Gateway {
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        models: Arc<dyn ModelCatalog>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Gateway {
            resolver: RouteResolver::new(definitions.clone()),
            definitions,
            models,
            executor: DocumentExecutor::new(documents),
        }
    }

    pub async fn ping(&self) -> Result<(), GatewayError> {
        self.definitions.ping().await
    }

    /// Serve one request against the declared definitions.
    pub async fn handle(&self, verb: &str, path: &str, body: &[u8]) -> Result<GatewayResponse, GatewayError> {
        tracing::debug!(verb, path, "gateway request");
        let api = self.resolver.resolve_api(path).await?;
        let model = self
            .models
            .model_by_api_id(&api.id)
            .await?
            .ok_or_else(|| GatewayError::ModelNotDeclared(api.name.clone()))?;

        if verb == "DELETE" && is_remove_collection(path, &api.url) {
            self.executor.remove_collection(&model.name).await?;
            return Ok(GatewayResponse::empty(StatusCode::NO_CONTENT));
        }

        let method = self.resolver.resolve_method(verb, path, &api).await?;
        if !method.verb.eq_ignore_ascii_case(verb) {
            return Err(GatewayError::MethodNotFound {
                verb: verb.to_string(),
                path: path.to_string(),
            });
        }

        let schema = ModelSchema::parse(&model.schema)?;
        let parameter = extract_parameter(path, &api.url, &method.url, &schema)?;
        if let Some(p) = &parameter {
            tracing::debug!(key = %p.key, raw = %p.raw, value = %p.value, "path parameter");
        }
        let filter = parameter.map(|p| DocumentFilter::new(p.key, p.value));
        tracing::debug!(api = %api.name, method_id = %method.id, filter = ?filter, "dispatching");
        self.dispatch(&method, &model, &schema, filter.as_ref(), body).await
    }

    async fn dispatch(
        &self,
        method: &MethodDefinition,
        model: &ModelDefinition,
        schema: &ModelSchema,
        filter: Option<&DocumentFilter>,
        body: &[u8],
    ) -> Result<GatewayResponse, GatewayError> {
        let collection = model.name.as_str();
        match method.verb.to_ascii_uppercase().as_str() {
            "GET" if method.is_array => {
                let docs = self.executor.get_list(collection, filter).await?;
                Ok(GatewayResponse::json(StatusCode::OK, Value::Array(docs)))
            }
            "GET" => {
                let doc = self.executor.get(collection, filter).await?;
                Ok(GatewayResponse::json(StatusCode::OK, doc))
            }
            "POST" => {
                let body = RequestValidator::parse_body(body)?;
                let doc = self.executor.create(collection, schema, &body).await?;
                Ok(GatewayResponse::json(StatusCode::CREATED, doc))
            }
            "PUT" => {
                let body = RequestValidator::parse_body(body)?;
                let doc = self.executor.update(collection, schema, &body).await?;
                Ok(GatewayResponse::json(StatusCode::OK, doc))
            }
            "DELETE" => {
                self.executor.delete(collection, filter).await?;
                Ok(GatewayResponse::empty(StatusCode::NO_CONTENT))
            }
            other => Err(GatewayError::Internal(format!("incorrect http method: {}", other))),
        }
    }
}

fn is_remove_collection(path: &str, base_url: &str) -> bool {
    request_suffix(path, base_url)
        .and_then(|suffix| suffix.strip_prefix('/'))
        .map(|rest| rest == REMOVE_COLLECTION_SEGMENT)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiDefinition, DefinitionBundle};
    use crate::store::{DefinitionWriter, MemoryDefinitionStore, MemoryDocumentStore};
    use serde_json::json;

    const PET_SCHEMA: &str = r#"{
        "type": "object",
        "keys": ["id"],
        "required": ["id", "name"],
        "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
    }"#;

    fn method(id: &str, verb: &str, url: &str, is_array: bool) -> MethodDefinition {
        MethodDefinition {
            id: id.into(),
            api_id: "pets".into(),
            verb: verb.into(),
            url: url.into(),
            is_array,
            ..Default::default()
        }
    }

    async fn gateway(methods: Vec<MethodDefinition>, schema: &str) -> Gateway {
        let defs = Arc::new(MemoryDefinitionStore::new());
        defs.install(&DefinitionBundle {
            apis: vec![ApiDefinition {
                id: "pets".into(),
                name: "pets".into(),
                url: "pets".into(),
                ..Default::default()
            }],
            methods,
            models: vec![ModelDefinition {
                id: "pet".into(),
                api_id: "pets".into(),
                name: "pets".into(),
                schema: schema.into(),
                ..Default::default()
            }],
        })
        .await
        .unwrap();
        Gateway::new(defs.clone(), defs, Arc::new(MemoryDocumentStore::new()))
    }

    fn crud_methods() -> Vec<MethodDefinition> {
        vec![
            method("list", "GET", "", true),
            method("get", "GET", "/{id}", false),
            method("create", "POST", "", false),
            method("update", "PUT", "", false),
            method("delete", "DELETE", "/{id}", false),
            method("patch", "PATCH", "/{id}", false),
        ]
    }

    #[tokio::test]
    async fn crud_flow() {
        let gw = gateway(crud_methods(), PET_SCHEMA).await;
        let created = gw.handle("POST", "/pets", br#"{"id":42,"name":"Rex"}"#).await.unwrap();
        assert_eq!(created.status, StatusCode::CREATED);

        let one = gw.handle("GET", "/pets/42", b"").await.unwrap();
        assert_eq!(one.body, Some(json!({"id": 42, "name": "Rex"})));

        let all = gw.handle("GET", "/pets", b"").await.unwrap();
        assert_eq!(all.body, Some(json!([{"id": 42, "name": "Rex"}])));

        let updated = gw.handle("PUT", "/pets", br#"{"id":42,"name":"Max"}"#).await.unwrap();
        assert_eq!(updated.body, Some(json!({"id": 42, "name": "Max"})));

        let deleted = gw.handle("DELETE", "/pets/42", b"").await.unwrap();
        assert_eq!(deleted.status, StatusCode::NO_CONTENT);
        assert!(matches!(
            gw.handle("DELETE", "/pets/42", b"").await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failures_by_stage() {
        let gw = gateway(crud_methods(), PET_SCHEMA).await;
        assert!(matches!(gw.handle("GET", "/owners", b"").await, Err(GatewayError::ApiNotFound(_))));
        assert!(matches!(
            gw.handle("GET", "/pets/1/toys", b"").await,
            Err(GatewayError::MethodNotFound { .. })
        ));
        assert!(matches!(
            gw.handle("GET", "/pets/rex", b"").await,
            Err(GatewayError::TypeCoercion { .. })
        ));
        assert!(matches!(
            gw.handle("PATCH", "/pets/1", b"").await,
            Err(GatewayError::Internal(_))
        ));
        assert!(matches!(
            gw.handle("POST", "/pets", b"not json").await,
            Err(GatewayError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_model_is_reported() {
        let defs = Arc::new(MemoryDefinitionStore::new());
        defs.install(&DefinitionBundle {
            apis: vec![ApiDefinition {
                id: "bare".into(),
                name: "bare".into(),
                url: "bare".into(),
                ..Default::default()
            }],
            ..Default::default()
        })
        .await
        .unwrap();
        let gw = Gateway::new(defs.clone(), defs, Arc::new(MemoryDocumentStore::new()));
        assert!(matches!(
            gw.handle("GET", "/bare", b"").await,
            Err(GatewayError::ModelNotDeclared(_))
        ));
    }

    #[tokio::test]
    async fn schema_without_single_key_fails_every_write() {
        let two_keys = r#"{"keys": ["id", "name"], "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}}"#;
        let gw = gateway(crud_methods(), two_keys).await;
        assert!(matches!(
            gw.handle("POST", "/pets", br#"{"id":1,"name":"Rex"}"#).await,
            Err(GatewayError::Schema(_))
        ));
    }

    #[tokio::test]
    async fn reserved_segment_drops_collection() {
        let gw = gateway(crud_methods(), PET_SCHEMA).await;
        gw.handle("POST", "/pets", br#"{"id":1,"name":"Rex"}"#).await.unwrap();
        let resp = gw.handle("DELETE", "/pets/remove-target-collection", b"").await.unwrap();
        assert_eq!(resp.status, StatusCode::NO_CONTENT);
        assert!(matches!(gw.handle("GET", "/pets", b"").await, Err(GatewayError::NotFound(_))));
    }
}
