//! Gateway responses: the raw stored document(s), no envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl GatewayResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        GatewayResponse {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        GatewayResponse { status, body: None }
    }
}

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}
