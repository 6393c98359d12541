//! Permission check and grant handlers.
use crate::api::error::{ApiError, api_authz};
use crate::api::types::{
    ErrorResponse, MutationResponse, OperationsQuery, OperationsResponse, PermissionCheckQuery,
    PermissionCheckResponse, PermissionGrantRequest,
};
use crate::api::{parse_actions, require_non_empty};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};

#[utoipa::path(
    get,
    path = "/v1/permissions/check",
    tag = "permissions",
    params(
        ("user" = String, Query, description = "User identifier"),
        ("menu" = String, Query, description = "Menu permission key, e.g. finance/invoice"),
        ("action" = String, Query, description = "create, read, update or delete")
    ),
    responses(
        (status = 200, description = "Check result", body = PermissionCheckResponse),
        (status = 500, description = "Check could not be evaluated", body = ErrorResponse)
    )
)]
pub async fn check_permission(
    State(state): State<AppState>,
    Query(query): Query<PermissionCheckQuery>,
) -> Result<Json<PermissionCheckResponse>, ApiError> {
    let check = state
        .authz
        .check_permission(&query.user, &query.menu, &query.action)
        .await
        .map_err(|err| api_authz("permission check failed", &err))?;
    Ok(Json(PermissionCheckResponse {
        allowed: check.allowed,
        exists: check.exists,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/users/{user}/operations",
    tag = "permissions",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("object" = String, Query, description = "Menu permission key")
    ),
    responses((status = 200, description = "Actions the user holds", body = OperationsResponse))
)]
pub async fn user_operations(
    Path(user): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<OperationsResponse>, ApiError> {
    require_non_empty("object", &query.object)?;
    let held = state
        .authz
        .operations_held(&user, &query.object)
        .await
        .map_err(|err| api_authz("failed to list operations", &err))?;
    Ok(Json(OperationsResponse {
        user,
        object: query.object,
        operations: held.iter().map(|action| action.to_string()).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/roles/{role}/permissions",
    tag = "permissions",
    params(("role" = String, Path, description = "Role name")),
    request_body = PermissionGrantRequest,
    responses(
        (status = 200, description = "Grant stored", body = MutationResponse),
        (status = 400, description = "Invalid object or actions", body = ErrorResponse)
    )
)]
pub async fn grant_permission(
    Path(role): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<PermissionGrantRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    require_non_empty("object", &body.object)?;
    let actions = parse_actions(&body.actions)?;
    let changed = state
        .authz
        .grant_permission(&role, &body.object, &actions)
        .await
        .map_err(|err| api_authz("failed to grant permission", &err))?;
    Ok(Json(MutationResponse { changed }))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{role}/permissions",
    tag = "permissions",
    params(("role" = String, Path, description = "Role name")),
    request_body = PermissionGrantRequest,
    responses(
        (status = 200, description = "Grant removed if present", body = MutationResponse),
        (status = 400, description = "Invalid object or actions", body = ErrorResponse)
    )
)]
pub async fn revoke_permission(
    Path(role): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<PermissionGrantRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    require_non_empty("object", &body.object)?;
    let actions = parse_actions(&body.actions)?;
    let changed = state
        .authz
        .revoke_permission(&role, &body.object, &actions)
        .await
        .map_err(|err| api_authz("failed to revoke permission", &err))?;
    Ok(Json(MutationResponse { changed }))
}
