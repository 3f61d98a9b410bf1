use crate::error::GatewayError;
use crate::response::GatewayResponse;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{Method, Uri},
};

/// Hand the raw verb, path and body to the gateway. Query strings are ignored.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<GatewayResponse, GatewayError> {
    state.gateway.handle(method.as_str(), uri.path(), &body).await
}
