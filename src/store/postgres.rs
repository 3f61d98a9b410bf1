//! PostgreSQL-backed stores. Definitions live in `_sys_apis`, `_sys_methods`, `_sys_models`; documents
//! live in `_sys_documents` as JSONB keyed by (collection, doc_key). All tables sit in one schema.

use crate::config::{normalize_base_url, ApiDefinition, DefinitionBundle, MethodDefinition, ModelDefinition};
use crate::error::{DefinitionError, GatewayError};
use crate::store::{
    duplicate_key, DefinitionStore, DefinitionWriter, DeletedApi, DocumentFilter, DocumentStore, InstallSummary,
    ModelCatalog,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

const API_COLUMNS: &str = "id, name, url, description, created_at, updated_at";
const METHOD_COLUMNS: &str = "id, api_id, verb, url, description, request_parameter, request_model_id, \
     response_model_id, is_array, created_at, updated_at";
const MODEL_COLUMNS: &str = "id, api_id, name, description, \"schema\", created_at, updated_at";

fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), table)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create `schema` if missing, then the definition and document tables.
pub async fn ensure_sys_tables(pool: &PgPool, schema: &str) -> Result<(), GatewayError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
        .execute(pool)
        .await?;

    let apis = qualified(schema, "_sys_apis");
    let methods = qualified(schema, "_sys_methods");
    let models = qualified(schema, "_sys_models");
    let documents = qualified(schema, "_sys_documents");

    let ddl = [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {apis} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {methods} (
                id TEXT PRIMARY KEY,
                api_id TEXT NOT NULL REFERENCES {apis} (id) ON DELETE CASCADE,
                verb TEXT NOT NULL,
                url TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                request_parameter TEXT NOT NULL DEFAULT '',
                request_model_id TEXT NOT NULL DEFAULT '',
                response_model_id TEXT NOT NULL DEFAULT '',
                is_array BOOLEAN NOT NULL DEFAULT FALSE,
                seq BIGSERIAL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {models} (
                id TEXT PRIMARY KEY,
                api_id TEXT NOT NULL REFERENCES {apis} (id) ON DELETE CASCADE,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                "schema" TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {documents} (
                collection TEXT NOT NULL,
                doc_key JSONB NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, doc_key)
            )
            "#
        ),
    ];
    for sql in &ddl {
        sqlx::query(sql).execute(pool).await?;
    }
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), GatewayError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| GatewayError::Internal(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), GatewayError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| GatewayError::Internal("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

/// A unique violation means the definition clashes with one installed for another API.
fn on_unique_violation(err: sqlx::Error, conflict: impl FnOnce() -> DefinitionError) -> GatewayError {
    match err {
        sqlx::Error::Database(e) if e.is_unique_violation() => conflict().into(),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct PgDefinitionStore {
    pool: PgPool,
    schema: String,
}

impl PgDefinitionStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgDefinitionStore {
            pool,
            schema: schema.into(),
        }
    }

    fn table(&self, name: &str) -> String {
        qualified(&self.schema, name)
    }
}

#[async_trait]
impl DefinitionStore for PgDefinitionStore {
    async fn api_by_url_prefix(&self, path: &str) -> Result<Option<ApiDefinition>, GatewayError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE $1 = url OR starts_with($1, url || '/') ORDER BY length(url) DESC LIMIT 1",
            API_COLUMNS,
            self.table("_sys_apis")
        );
        tracing::debug!(sql = %sql, path, "query");
        let api = sqlx::query_as::<_, ApiDefinition>(&sql)
            .bind(normalize_base_url(path))
            .fetch_optional(&self.pool)
            .await?;
        Ok(api)
    }

    async fn methods_by_api_id(&self, api_id: &str) -> Result<Vec<MethodDefinition>, GatewayError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE api_id = $1 ORDER BY seq",
            METHOD_COLUMNS,
            self.table("_sys_methods")
        );
        tracing::debug!(sql = %sql, api_id, "query");
        let methods = sqlx::query_as::<_, MethodDefinition>(&sql)
            .bind(api_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(methods)
    }

    async fn ping(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelCatalog for PgDefinitionStore {
    async fn model_by_api_id(&self, api_id: &str) -> Result<Option<ModelDefinition>, GatewayError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE api_id = $1 ORDER BY created_at LIMIT 1",
            MODEL_COLUMNS,
            self.table("_sys_models")
        );
        tracing::debug!(sql = %sql, api_id, "query");
        let model = sqlx::query_as::<_, ModelDefinition>(&sql)
            .bind(api_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(model)
    }
}

#[async_trait]
impl DefinitionWriter for PgDefinitionStore {
    /// Runs in one transaction: upsert APIs, then drop and re-insert their methods and models.
    async fn install(&self, bundle: &DefinitionBundle) -> Result<InstallSummary, GatewayError> {
        let apis = self.table("_sys_apis");
        let methods = self.table("_sys_methods");
        let models = self.table("_sys_models");
        let mut summary = InstallSummary::default();
        let mut tx = self.pool.begin().await?;

        for api in &bundle.apis {
            sqlx::query(&format!(
                r#"
                INSERT INTO {apis} (id, name, url, description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, NOW(), NOW())
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, url = EXCLUDED.url, description = EXCLUDED.description, updated_at = NOW()
                "#
            ))
            .bind(&api.id)
            .bind(&api.name)
            .bind(normalize_base_url(&api.url))
            .bind(&api.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| on_unique_violation(e, || DefinitionError::DuplicateBaseUrl(api.url.clone())))?;
            sqlx::query(&format!("DELETE FROM {methods} WHERE api_id = $1"))
                .bind(&api.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(&format!("DELETE FROM {models} WHERE api_id = $1"))
                .bind(&api.id)
                .execute(&mut *tx)
                .await?;
            summary.apis += 1;
        }

        for m in &bundle.methods {
            sqlx::query(&format!(
                r#"
                INSERT INTO {methods} (id, api_id, verb, url, description, request_parameter, request_model_id,
                    response_model_id, is_array)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#
            ))
            .bind(&m.id)
            .bind(&m.api_id)
            .bind(&m.verb)
            .bind(&m.url)
            .bind(&m.description)
            .bind(&m.request_parameter)
            .bind(&m.request_model_id)
            .bind(&m.response_model_id)
            .bind(m.is_array)
            .execute(&mut *tx)
            .await?;
            summary.methods += 1;
        }

        for m in &bundle.models {
            sqlx::query(&format!(
                r#"INSERT INTO {models} (id, api_id, name, description, "schema") VALUES ($1, $2, $3, $4, $5)"#
            ))
            .bind(&m.id)
            .bind(&m.api_id)
            .bind(&m.name)
            .bind(&m.description)
            .bind(&m.schema)
            .execute(&mut *tx)
            .await
            .map_err(|e| on_unique_violation(e, || DefinitionError::DuplicateCollection(m.name.clone())))?;
            summary.models += 1;
        }

        tx.commit().await?;
        Ok(summary)
    }

    async fn delete_api(&self, api_id: &str) -> Result<Option<DeletedApi>, GatewayError> {
        let mut tx = self.pool.begin().await?;
        let api = sqlx::query_as::<_, ApiDefinition>(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            API_COLUMNS,
            self.table("_sys_apis")
        ))
        .bind(api_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(api) = api else {
            return Ok(None);
        };
        let model = sqlx::query_as::<_, ModelDefinition>(&format!(
            "SELECT {} FROM {} WHERE api_id = $1 ORDER BY created_at LIMIT 1",
            MODEL_COLUMNS,
            self.table("_sys_models")
        ))
        .bind(api_id)
        .fetch_optional(&mut *tx)
        .await?;
        let methods = sqlx::query(&format!("DELETE FROM {} WHERE api_id = $1", self.table("_sys_methods")))
            .bind(api_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query(&format!("DELETE FROM {} WHERE api_id = $1", self.table("_sys_models")))
            .bind(api_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table("_sys_apis")))
            .bind(api_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(DeletedApi { api, methods, model }))
    }
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    table: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PgDocumentStore {
            pool,
            table: qualified(schema, "_sys_documents"),
        }
    }
}

/// `$2`/`$3` carry the filter key and value when a filter is present.
fn filter_clause(filter: Option<&DocumentFilter>) -> &'static str {
    if filter.is_some() {
        " AND body -> $2 = $3"
    } else {
        ""
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Option<Value>, GatewayError> {
        let sql = format!(
            "SELECT body FROM {} WHERE collection = $1{} ORDER BY created_at LIMIT 1",
            self.table,
            filter_clause(filter)
        );
        tracing::debug!(sql = %sql, filter = ?filter, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&sql).bind(collection);
        if let Some(f) = filter {
            query = query.bind(&f.key).bind(&f.value);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn find(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Vec<Value>, GatewayError> {
        let sql = format!(
            "SELECT body FROM {} WHERE collection = $1{} ORDER BY created_at",
            self.table,
            filter_clause(filter)
        );
        tracing::debug!(sql = %sql, filter = ?filter, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&sql).bind(collection);
        if let Some(f) = filter {
            query = query.bind(&f.key).bind(&f.value);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn insert(&self, collection: &str, key: &DocumentFilter, document: &Value) -> Result<Value, GatewayError> {
        let sql = format!(
            "INSERT INTO {} (collection, doc_key, body) VALUES ($1, $2, $3) RETURNING body",
            self.table
        );
        tracing::debug!(sql = %sql, key = ?key, "query");
        let result = sqlx::query_scalar::<_, Value>(&sql)
            .bind(collection)
            .bind(&key.value)
            .bind(document)
            .fetch_one(&self.pool)
            .await;
        match result {
            Ok(body) => Ok(body),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(duplicate_key(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn merge(&self, collection: &str, key: &DocumentFilter, document: &Value) -> Result<Option<Value>, GatewayError> {
        let sql = format!(
            "UPDATE {} SET body = body || $3, updated_at = NOW() WHERE collection = $1 AND doc_key = $2 RETURNING body",
            self.table
        );
        tracing::debug!(sql = %sql, key = ?key, "query");
        let body = sqlx::query_scalar::<_, Value>(&sql)
            .bind(collection)
            .bind(&key.value)
            .bind(document)
            .fetch_optional(&self.pool)
            .await?;
        Ok(body)
    }

    async fn delete_one(&self, collection: &str, filter: Option<&DocumentFilter>) -> Result<Option<Value>, GatewayError> {
        let sql = format!(
            "DELETE FROM {t} WHERE (collection, doc_key) IN \
             (SELECT collection, doc_key FROM {t} WHERE collection = $1{f} ORDER BY created_at LIMIT 1) \
             RETURNING body",
            t = self.table,
            f = filter_clause(filter)
        );
        tracing::debug!(sql = %sql, filter = ?filter, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&sql).bind(collection);
        if let Some(f) = filter {
            query = query.bind(&f.key).bind(&f.value);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    async fn drop_collection(&self, collection: &str) -> Result<u64, GatewayError> {
        let sql = format!("DELETE FROM {} WHERE collection = $1", self.table);
        tracing::debug!(sql = %sql, collection, "query");
        let result = sqlx::query(&sql).bind(collection).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
