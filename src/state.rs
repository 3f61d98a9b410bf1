//! Shared application state for all routes.

use crate::gateway::Gateway;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Definitions are read per request, so there is nothing to reload here.
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        AppState {
            gateway: Arc::new(gateway),
        }
    }
}
