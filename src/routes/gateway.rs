//! Catch-all route: every request not claimed by another route goes to the gateway.

use crate::handlers::dispatch;
use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub fn gateway_routes(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(state)
}
