//! Definition records: APIs, their methods, and their document models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Base URL; every method's template is appended to it.
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MethodDefinition {
    #[serde(default)]
    pub id: String,
    pub api_id: String,
    /// HTTP verb, upper case.
    #[serde(rename = "type")]
    pub verb: String,
    /// Template relative to the API base url: empty, or e.g. `/{id}`, `/search/{name}`.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request_parameter: String,
    #[serde(default)]
    pub request_model_id: String,
    #[serde(default)]
    pub response_model_id: String,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    #[serde(default)]
    pub id: String,
    pub api_id: String,
    /// Also the name of the document collection.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema text with a top-level `keys` array.
    pub schema: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A set of definitions installed together.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DefinitionBundle {
    #[serde(default)]
    pub apis: Vec<ApiDefinition>,
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
}

/// Base URLs and request paths are compared without surrounding slashes.
pub fn normalize_base_url(url: &str) -> &str {
    url.trim_matches('/')
}
