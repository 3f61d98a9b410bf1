//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Problems with a model's JSON Schema document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("model schema is not valid JSON: {0}")]
    Malformed(String),
    #[error("model schema must be a JSON object")]
    NotAnObject,
    #[error("model schema declares no keys")]
    MissingKeys,
    #[error("model schema declares {0} keys; exactly one is supported")]
    MultipleKeys(usize),
    #[error("key '{0}' is not declared in properties")]
    KeyNotDeclared(String),
    #[error("property '{0}' is not declared in the model schema")]
    UndeclaredProperty(String),
    #[error("property '{property}' has unsupported type '{type_name}'")]
    UnsupportedType { property: String, type_name: String },
}

/// Rejections raised while validating API/Method/Model definitions.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid base url '{0}': printable ASCII without spaces only")]
    InvalidBaseUrl(String),
    #[error("duplicate base url: {0}")]
    DuplicateBaseUrl(String),
    #[error("invalid method url '{url}': {reason}")]
    InvalidTemplate { url: String, reason: &'static str },
    #[error("invalid http verb: {0}")]
    InvalidVerb(String),
    #[error("a {verb} method with the same url shape already exists: {existing}")]
    ShapeCollision { verb: String, existing: String },
    #[error("model '{model}': {source}")]
    Schema {
        model: String,
        #[source]
        source: SchemaError,
    },
    #[error("duplicate collection name: {0}")]
    DuplicateCollection(String),
    #[error("api '{0}' declares more than one model")]
    MultipleModels(String),
    #[error("method '{method}' parameter '{parameter}': {reason}")]
    InvalidParameter {
        method: String,
        parameter: String,
        reason: String,
    },
    #[error("definition load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Invalid environment configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("api not found: {0}")]
    ApiNotFound(String),
    #[error("method not found: {verb} {path}")]
    MethodNotFound { verb: String, path: String },
    #[error("model not declared for api '{0}'")]
    ModelNotDeclared(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("validation: {0}")]
    Validation(String),
    #[error("cannot convert '{value}' to {expected} for parameter '{key}'")]
    TypeCoercion {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("not an allowed key type: {0}")]
    UnsupportedKeyType(String),
    #[error("record already exists: {key} = {value}")]
    DuplicateKey { key: String, value: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ApiNotFound(_)
            | GatewayError::MethodNotFound { .. }
            | GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ModelNotDeclared(_)
            | GatewayError::Schema(_)
            | GatewayError::Validation(_)
            | GatewayError::TypeCoercion { .. }
            | GatewayError::UnsupportedKeyType(_)
            | GatewayError::DuplicateKey { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            GatewayError::Internal(_) | GatewayError::Definition(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        assert_eq!(GatewayError::ApiNotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::MethodNotFound {
                verb: "GET".into(),
                path: "x".into()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(GatewayError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(GatewayError::ModelNotDeclared("a".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::Schema(SchemaError::MissingKeys).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::DuplicateKey {
                key: "id".into(),
                value: "1".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GatewayError::UnsupportedKeyType("boolean".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayError::Internal("boom".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(GatewayError::Db(sqlx::Error::PoolClosed).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
