//! Definition administration: install a bundle, delete an API with its collection.

use crate::config::{prepare_bundle, DefinitionBundle};
use crate::error::GatewayError;
use crate::service::DocumentExecutor;
use crate::store::{DefinitionWriter, InstallSummary};

/// Validate and install. Nothing is written when validation fails.
pub async fn install_definitions(
    writer: &dyn DefinitionWriter,
    bundle: DefinitionBundle,
) -> Result<InstallSummary, GatewayError> {
    let bundle = prepare_bundle(bundle)?;
    let summary = writer.install(&bundle).await?;
    tracing::info!(
        apis = summary.apis,
        methods = summary.methods,
        models = summary.models,
        "definitions installed"
    );
    Ok(summary)
}

/// Delete an API, its methods and model, then drop the model's collection.
pub async fn delete_api(
    writer: &dyn DefinitionWriter,
    executor: &DocumentExecutor,
    api_id: &str,
) -> Result<(), GatewayError> {
    let deleted = writer
        .delete_api(api_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("api {}", api_id)))?;
    tracing::info!(api = %deleted.api.name, methods = deleted.methods, "api deleted");
    if let Some(model) = deleted.model {
        executor.remove_collection(&model.name).await?;
    }
    Ok(())
}
