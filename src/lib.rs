//! API creator SDK: serve operator-declared HTTP APIs over schema-validated document collections.
//!
//! APIs, their methods and their models are plain data in a definition store. Each request is resolved
//! against those definitions at request time and dispatched to generic document CRUD.

pub mod admin;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod routing;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;

pub use admin::{delete_api, install_definitions};
pub use config::{load_bundle, DefinitionBundle, Settings};
pub use error::{DefinitionError, GatewayError, SchemaError, SettingsError};
pub use gateway::Gateway;
pub use response::GatewayResponse;
pub use routes::{common_routes_with_ready, gateway_routes};
pub use state::AppState;
pub use store::{
    ensure_database_exists, ensure_sys_tables, MemoryDefinitionStore, MemoryDocumentStore, PgDefinitionStore,
    PgDocumentStore,
};
