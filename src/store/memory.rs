//! In-process stores with the same semantics as the PostgreSQL ones.

use crate::config::{normalize_base_url, ApiDefinition, DefinitionBundle, MethodDefinition, ModelDefinition};
use crate::error::{DefinitionError, GatewayError};
use crate::routing::request_suffix;
use crate::store::{
    duplicate_key, same_value, DefinitionStore, DefinitionWriter, DeletedApi, DocumentFilter, DocumentStore, InstallSummary,
    ModelCatalog,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct Definitions {
    apis: Vec<ApiDefinition>,
    methods: Vec<MethodDefinition>,
    models: Vec<ModelDefinition>,
}

#[derive(Default)]
pub struct MemoryDefinitionStore {
    inner: RwLock<Definitions>,
}

impl MemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionStore for MemoryDefinitionStore {
    async fn api_by_url_prefix(&self, path: &str) -> Result<Option<ApiDefinition>, GatewayError> {
        let defs = self.inner.read().await;
        let api = defs
            .apis
            .iter()
            .filter(|api| request_suffix(path, &api.url).is_some())
            .max_by_key(|api| normalize_base_url(&api.url).len());
        Ok(api.cloned())
    }

    async fn methods_by_api_id(&self, api_id: &str) -> Result<Vec<MethodDefinition>, GatewayError> {
        let defs = self.inner.read().await;
        Ok(defs.methods.iter().filter(|m| m.api_id == api_id).cloned().collect())
    }
}

#[async_trait]
impl ModelCatalog for MemoryDefinitionStore {
    async fn model_by_api_id(&self, api_id: &str) -> Result<Option<ModelDefinition>, GatewayError> {
        let defs = self.inner.read().await;
        Ok(defs.models.iter().find(|m| m.api_id == api_id).cloned())
    }
}

/// Base urls and collection names must stay unique across installed APIs. Definitions of APIs in the
/// bundle are about to be replaced, so they never conflict.
fn check_conflicts(defs: &Definitions, bundle: &DefinitionBundle) -> Result<(), DefinitionError> {
    let replaced: HashSet<&str> = bundle.apis.iter().map(|a| a.id.as_str()).collect();
    for api in &bundle.apis {
        let url = normalize_base_url(&api.url);
        if defs
            .apis
            .iter()
            .any(|a| !replaced.contains(a.id.as_str()) && normalize_base_url(&a.url) == url)
        {
            return Err(DefinitionError::DuplicateBaseUrl(api.url.clone()));
        }
    }
    for model in &bundle.models {
        if defs
            .models
            .iter()
            .any(|m| !replaced.contains(m.api_id.as_str()) && m.name == model.name)
        {
            return Err(DefinitionError::DuplicateCollection(model.name.clone()));
        }
    }
    Ok(())
}

#[async_trait]
impl DefinitionWriter for MemoryDefinitionStore {
    async fn install(&self, bundle: &DefinitionBundle) -> Result<InstallSummary, GatewayError> {
        let now = Utc::now();
        let mut defs = self.inner.write().await;
        check_conflicts(&defs, bundle)?;
        let mut summary = InstallSummary::default();
        for api in &bundle.apis {
            defs.methods.retain(|m| m.api_id != api.id);
            defs.models.retain(|m| m.api_id != api.id);
            let mut api = api.clone();
            api.url = normalize_base_url(&api.url).to_string();
            api.updated_at = Some(now);
            match defs.apis.iter().position(|a| a.id == api.id) {
                Some(pos) => {
                    api.created_at = defs.apis[pos].created_at;
                    defs.apis[pos] = api;
                }
                None => {
                    api.created_at = Some(now);
                    defs.apis.push(api);
                }
            }
            summary.apis += 1;
        }
        for method in &bundle.methods {
            let mut method = method.clone();
            method.created_at = Some(now);
            method.updated_at = Some(now);
            defs.methods.push(method);
            summary.methods += 1;
        }
        for model in &bundle.models {
            let mut model = model.clone();
            model.created_at = Some(now);
            model.updated_at = Some(now);
            defs.models.push(model);
            summary.models += 1;
        }
        Ok(summary)
    }

    async fn delete_api(&self, api_id: &str) -> Result<Option<DeletedApi>, GatewayError> {
        let mut defs = self.inner.write().await;
        let Some(pos) = defs.apis.iter().position(|a| a.id == api_id) else {
            return Ok(None);
        };
        let api = defs.apis.remove(pos);
        let before = defs.methods.len();
        defs.methods.retain(|m| m.api_id != api_id);
        let methods = (before - defs.methods.len()) as u64;
        let model = defs
            .models
            .iter()
            .position(|m| m.api_id == api_id)
            .map(|pos| defs.models.remove(pos));
        defs.models.retain(|m| m.api_id != api_id);
        Ok(Some(DeletedApi { api, methods, model }))
    }
}

struct StoredDocument {
    key: Value,
    body: Value,
}

/// Collections keyed by name; documents keep insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(filter: Option<&DocumentFilter>, doc: &StoredDocument) -> bool {
    filter.map(|f| f.matches(&doc.body)).unwrap_or(true)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Option<Value>, GatewayError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(filter, d)))
            .map(|d| d.body.clone()))
    }

    async fn find(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Vec<Value>, GatewayError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(filter, d)).map(|d| d.body.clone()).collect())
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, key: &DocumentFilter, document: &Value) -> Result<Value, GatewayError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| same_value(&d.key, &key.value)) {
            return Err(duplicate_key(key));
        }
        docs.push(StoredDocument {
            key: key.value.clone(),
            body: document.clone(),
        });
        Ok(document.clone())
    }

    async fn merge(&self, collection: &str, key: &DocumentFilter, document: &Value) -> Result<Option<Value>, GatewayError> {
        let mut collections = self.collections.write().await;
        let Some(stored) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| same_value(&d.key, &key.value)))
        else {
            return Ok(None);
        };
        if let (Value::Object(target), Value::Object(fields)) = (&mut stored.body, document) {
            for (name, value) in fields {
                target.insert(name.clone(), value.clone());
            }
        } else {
            stored.body = document.clone();
        }
        Ok(Some(stored.body.clone()))
    }

    async fn delete_one(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Option<Value>, GatewayError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| matches(filter, d))
            .map(|pos| docs.remove(pos).body))
    }

    async fn drop_collection(&self, collection: &str) -> Result<u64, GatewayError> {
        let mut collections = self.collections.write().await;
        Ok(collections.remove(collection).map(|docs| docs.len() as u64).unwrap_or(0))
    }
}
