//! Gateway server: serves every API declared in the definition store.
//!
//! Run from repo root: `cargo run -p gateway-server`
//! Without `DATABASE_URL` the definitions and documents live in memory; set `GATEWAY_DEFINITIONS`
//! to a bundle file to have something to serve.

use api_creator_sdk::{
    common_routes_with_ready, ensure_database_exists, ensure_sys_tables, gateway_routes, install_definitions,
    load_bundle,
    store::{DefinitionWriter, ModelCatalog},
    AppState, Gateway, MemoryDefinitionStore, MemoryDocumentStore, PgDefinitionStore, PgDocumentStore, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("api_creator_sdk=info,gateway_server=info")
            }),
        )
        .init();

    let settings = Settings::from_env()?;
    let gateway = match &settings.database_url {
        Some(database_url) => {
            ensure_database_exists(database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(database_url)
                .await?;
            ensure_sys_tables(&pool, &settings.schema).await?;
            let definitions = Arc::new(PgDefinitionStore::new(pool.clone(), settings.schema.clone()));
            install_from(&settings, definitions.as_ref()).await?;
            let documents = Arc::new(PgDocumentStore::new(pool, &settings.schema));
            Gateway::new(definitions.clone(), definitions as Arc<dyn ModelCatalog>, documents)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, definitions and documents are kept in memory");
            let definitions = Arc::new(MemoryDefinitionStore::new());
            install_from(&settings, definitions.as_ref()).await?;
            Gateway::new(
                definitions.clone(),
                definitions as Arc<dyn ModelCatalog>,
                Arc::new(MemoryDocumentStore::new()),
            )
        }
    };

    let state = AppState::new(gateway);
    let app = common_routes_with_ready(state.clone()).merge(gateway_routes(state, settings.body_limit));
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Gateway listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn install_from(settings: &Settings, writer: &dyn DefinitionWriter) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &settings.definitions {
        let bundle = load_bundle(path).await?;
        install_definitions(writer, bundle).await?;
        tracing::info!(path = %path.display(), "definition bundle installed");
    }
    Ok(())
}
