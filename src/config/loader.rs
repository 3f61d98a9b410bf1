//! Load a definition bundle from a JSON file.

use crate::config::{prepare_bundle, DefinitionBundle};
use crate::error::DefinitionError;
use std::path::Path;

/// Read, parse and validate a bundle. Missing ids are filled in.
pub async fn load_bundle(path: impl AsRef<Path>) -> Result<DefinitionBundle, DefinitionError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DefinitionError::Load(format!("{}: {}", path.display(), e)))?;
    parse_bundle(&text)
}

pub fn parse_bundle(text: &str) -> Result<DefinitionBundle, DefinitionError> {
    let bundle: DefinitionBundle =
        serde_json::from_str(text).map_err(|e| DefinitionError::Load(e.to_string()))?;
    prepare_bundle(bundle)
}
