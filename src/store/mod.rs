//! Storage seams: definition lookup, model catalog, definition writes, and document collections.
//! PostgreSQL implementations live in `postgres`, in-process ones in `memory`.

use crate::config::{ApiDefinition, DefinitionBundle, MethodDefinition, ModelDefinition};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryDefinitionStore, MemoryDocumentStore};
pub use postgres::{ensure_database_exists, ensure_sys_tables, PgDefinitionStore, PgDocumentStore};

/// Exact-match condition on one top-level document field.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentFilter {
    pub key: String,
    pub value: Value,
}

impl DocumentFilter {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        DocumentFilter { key: key.into(), value }
    }

    pub fn matches(&self, document: &Value) -> bool {
        document.get(&self.key).map(|v| same_value(v, &self.value)).unwrap_or(false)
    }
}

/// JSON equality with numbers compared by value, so `1` and `1.0` are the same key.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Integral floats become integers; every other value is returned unchanged.
pub fn normalize_key(value: Value) -> Value {
    match value.as_f64() {
        Some(f) if value.is_f64() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Value::from(f as i64)
        }
        _ => value,
    }
}

#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// API whose base url prefixes `path` at a segment boundary; the longest base url wins.
    async fn api_by_url_prefix(&self, path: &str) -> Result<Option<ApiDefinition>, GatewayError>;

    /// Methods of an API in declaration order.
    async fn methods_by_api_id(&self, api_id: &str) -> Result<Vec<MethodDefinition>, GatewayError>;

    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn model_by_api_id(&self, api_id: &str) -> Result<Option<ModelDefinition>, GatewayError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallSummary {
    pub apis: u64,
    pub methods: u64,
    pub models: u64,
}

/// What `DefinitionWriter::delete_api` removed.
#[derive(Clone, Debug)]
pub struct DeletedApi {
    pub api: ApiDefinition,
    pub methods: u64,
    pub model: Option<ModelDefinition>,
}

#[async_trait]
pub trait DefinitionWriter: Send + Sync {
    /// Upsert every API of the bundle and replace its methods and model with the bundle's.
    async fn install(&self, bundle: &DefinitionBundle) -> Result<InstallSummary, GatewayError>;

    /// Remove an API with its methods and model. `None` if the API doesn't exist.
    async fn delete_api(&self, api_id: &str) -> Result<Option<DeletedApi>, GatewayError>;
}

/// Schema-less JSON document collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Option<Value>, GatewayError>;

    async fn find(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Vec<Value>, GatewayError>;

    /// Insert `document` identified by `key`. Fails with `DuplicateKey` when the collection already
    /// holds a document with the same key value.
    async fn insert(&self, collection: &str, key: &DocumentFilter, document: &Value) -> Result<Value, GatewayError>;

    /// Set every top-level field of `document` on the document identified by `key`.
    async fn merge(&self, collection: &str, key: &DocumentFilter, document: &Value) -> Result<Option<Value>, GatewayError>;

    /// Remove one matching document and return it.
    async fn delete_one(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Option<Value>, GatewayError>;

    /// Remove the whole collection; returns the number of documents removed.
    async fn drop_collection(&self, collection: &str) -> Result<u64, GatewayError>;
}

pub(crate) fn duplicate_key(key: &DocumentFilter) -> GatewayError {
    GatewayError::DuplicateKey {
        key: key.key.clone(),
        value: key.value.to_string(),
    }
}
