//! System/health handlers.
//!
//! # Key invariants and assumptions
//! - Health checks must be fast and side-effect free.
use crate::api::error::{ApiError, api_internal_message};
use crate::api::types::{ErrorResponse, HealthStatus};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 500, description = "Policy store unreachable", body = ErrorResponse)
    )
)]
/// Probe the policy store and report `ok` when it answers.
pub async fn system_health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    let store = state.authz.engine().store();
    if let Err(err) = store.health_check().await {
        tracing::error!(error = ?err, "policy store health check failed");
        return Err(api_internal_message("policy store unavailable"));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        backend: store.backend_name().to_string(),
        durable: store.is_durable(),
    }))
}
