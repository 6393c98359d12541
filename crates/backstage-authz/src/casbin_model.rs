use crate::errors::EngineError;
use crate::{AuthzError, AuthzResult};
use casbin::DefaultModel;
use std::io::Write;

const MODEL: &str = include_str!("rbac_model.conf");

pub fn casbin_model_string() -> &'static str {
    MODEL
}

/// Load a casbin model by staging `definition` in a temporary file.
///
/// The casbin loader only reads models from a path, so the text is written to
/// a `NamedTempFile` that is removed before returning, whether loading
/// succeeded or not. A failed removal is logged and otherwise ignored.
pub async fn load_model(definition: &str) -> AuthzResult<DefaultModel> {
    let staged = stage_model(definition)?;
    let loaded = DefaultModel::from_file(staged.path()).await;
    let path = staged.path().display().to_string();
    if let Err(err) = staged.close() {
        tracing::warn!(error = %err, %path, "failed to remove staged casbin model");
    }
    loaded.map_err(|err| AuthzError::Engine(EngineError::Casbin(err)))
}

fn stage_model(definition: &str) -> AuthzResult<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("rbac-model-")
        .suffix(".conf")
        .tempfile()
        .map_err(AuthzError::ModelStaging)?;
    file.write_all(definition.as_bytes())
        .and_then(|_| file.flush())
        .map_err(AuthzError::ModelStaging)?;
    Ok(file)
}
