use crate::policy_store::StoreError;
use thiserror::Error;

/// Failures raised by the casbin-backed policy engine.
///
/// Store failures are folded in here so callers see one engine error whether
/// the enforcer or the backing table misbehaved.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("casbin: {0}")]
    Casbin(#[from] casbin::Error),
    #[error("policy store: {0}")]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("malformed menu definition: {0}")]
    MenuFormat(#[from] serde_json::Error),
    #[error("failed to stage enforcement model: {0}")]
    ModelStaging(#[source] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("invalid matcher arguments: {0}")]
    InvalidArguments(String),
    #[error(
        "role reconciliation for {user} stopped removing {failed_role} \
         (added {added:?}, removed {removed:?})"
    )]
    PartialReconciliation {
        user: String,
        added: Vec<String>,
        removed: Vec<String>,
        failed_role: String,
        #[source]
        source: EngineError,
    },
}

impl AuthzError {
    /// True when the failure came from the enforcer or the policy store.
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            AuthzError::Engine(_) | AuthzError::PartialReconciliation { .. }
        )
    }
}

pub type AuthzResult<T> = Result<T, AuthzError>;
