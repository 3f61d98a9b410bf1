//! Generic document CRUD over a model's collection.

use crate::error::GatewayError;
use crate::schema::ModelSchema;
use crate::service::RequestValidator;
use crate::store::{normalize_key, DocumentFilter, DocumentStore};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct DocumentExecutor {
    store: Arc<dyn DocumentStore>,
}

fn describe(collection: &str, filter: Option<&DocumentFilter>) -> String {
    match filter {
        Some(f) => format!("{} where {} = {}", collection, f.key, f.value),
        None => collection.to_string(),
    }
}

/// Key filter built from the schema's key property and its value in `body`.
fn key_filter(schema: &ModelSchema, body: &Value) -> Result<DocumentFilter, GatewayError> {
    let key = schema.key_name()?;
    match body.get(key) {
        Some(value) if !value.is_null() => Ok(DocumentFilter::new(key, normalize_key(value.clone()))),
        _ => Err(GatewayError::Validation(format!("target property '{}' is not found", key))),
    }
}

impl DocumentExecutor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        DocumentExecutor { store }
    }

    /// Exactly one document; the first of the collection when there is no filter.
    pub async fn get(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Value, GatewayError> {
        self.store
            .find_one(collection, filter)
            .await?
            .ok_or_else(|| GatewayError::NotFound(describe(collection, filter)))
    }

    /// Matching documents, or the whole collection without a filter. An empty result is `NotFound`.
    pub async fn get_list(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Vec<Value>, GatewayError> {
        let docs = self.store.find(collection, filter).await?;
        if docs.is_empty() {
            return Err(GatewayError::NotFound(describe(collection, filter)));
        }
        Ok(docs)
    }

    /// Validate and insert. Uniqueness of the key is left to the store.
    pub async fn create(&self, collection: &str, schema: &ModelSchema, body: &Value) -> Result<Value, GatewayError> {
        RequestValidator::validate(schema, body)?;
        let key = key_filter(schema, body)?;
        let doc = self.store.insert(collection, &key, body).await?;
        tracing::debug!(collection, key = %key.key, value = %key.value, "document created");
        Ok(doc)
    }

    /// Validate and merge onto the document with the same key.
    pub async fn update(&self, collection: &str, schema: &ModelSchema, body: &Value) -> Result<Value, GatewayError> {
        RequestValidator::validate(schema, body)?;
        let key = key_filter(schema, body)?;
        self.store
            .merge(collection, &key, body)
            .await?
            .ok_or_else(|| GatewayError::NotFound(describe(collection, Some(&key))))
    }

    pub async fn delete(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<(), GatewayError> {
        self.store
            .delete_one(collection, filter)
            .await?
            .ok_or_else(|| GatewayError::NotFound(describe(collection, filter)))?;
        Ok(())
    }

    pub async fn remove_collection(&self, collection: &str) -> Result<u64, GatewayError> {
        let removed = self.store.drop_collection(collection).await?;
        tracing::info!(collection, removed, "collection removed");
        Ok(removed)
    }
}
