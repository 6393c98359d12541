//! Role assignment and role listing handlers.
//!
//! # Key invariants
//! - `PUT /v1/users/{user}/roles` replaces the user's direct roles with the
//!   body's set. A failure partway through leaves the roles partially updated
//!   and is reported with code `partial_reconciliation`.
use crate::api::error::{ApiError, api_authz, api_not_found};
use crate::api::types::{
    ErrorResponse, MutationResponse, PermissionView, RoleAssignRequest, RoleListResponse,
    RolePermissionsQuery, RolePermissionsResponse, RolePermissionsView, RoleReconcileRequest,
    UserRolesResponse,
};
use crate::api::{require_non_empty, split_list};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use backstage_authz::permission_map;

#[utoipa::path(
    get,
    path = "/v1/users/{user}/roles",
    tag = "roles",
    params(("user" = String, Path, description = "User identifier")),
    responses((status = 200, description = "Direct roles of the user", body = UserRolesResponse))
)]
pub async fn get_user_roles(
    Path(user): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserRolesResponse>, ApiError> {
    let roles = state
        .authz
        .roles_for_user(&user)
        .await
        .map_err(|err| api_authz("failed to load roles", &err))?;
    Ok(Json(UserRolesResponse { user, roles }))
}

#[utoipa::path(
    put,
    path = "/v1/users/{user}/roles",
    tag = "roles",
    params(("user" = String, Path, description = "User identifier")),
    request_body = RoleReconcileRequest,
    responses(
        (status = 200, description = "Roles now equal the requested set", body = UserRolesResponse),
        (status = 500, description = "Reconciliation failed", body = ErrorResponse)
    )
)]
pub async fn reconcile_user_roles(
    Path(user): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<RoleReconcileRequest>,
) -> Result<Json<UserRolesResponse>, ApiError> {
    require_non_empty("user", &user)?;
    for role in &body.roles {
        require_non_empty("role", role)?;
    }
    state
        .authz
        .reconcile_user_roles(&user, &body.roles)
        .await
        .map_err(|err| api_authz("failed to update roles", &err))?;
    let roles = state
        .authz
        .roles_for_user(&user)
        .await
        .map_err(|err| api_authz("failed to load roles", &err))?;
    Ok(Json(UserRolesResponse { user, roles }))
}

#[utoipa::path(
    post,
    path = "/v1/users/{user}/roles",
    tag = "roles",
    params(("user" = String, Path, description = "User identifier")),
    request_body = RoleAssignRequest,
    responses((status = 200, description = "Role assigned", body = MutationResponse))
)]
pub async fn assign_role(
    Path(user): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<RoleAssignRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    require_non_empty("role", &body.role)?;
    let changed = state
        .authz
        .assign_role(&user, &body.role)
        .await
        .map_err(|err| api_authz("failed to assign role", &err))?;
    Ok(Json(MutationResponse { changed }))
}

#[utoipa::path(
    delete,
    path = "/v1/users/{user}/roles/{role}",
    tag = "roles",
    params(
        ("user" = String, Path, description = "User identifier"),
        ("role" = String, Path, description = "Role name")
    ),
    responses((status = 200, description = "Role removed if assigned", body = MutationResponse))
)]
pub async fn unassign_role(
    Path((user, role)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<MutationResponse>, ApiError> {
    let changed = state
        .authz
        .unassign_role(&user, &role)
        .await
        .map_err(|err| api_authz("failed to remove role", &err))?;
    Ok(Json(MutationResponse { changed }))
}

#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "roles",
    responses((status = 200, description = "Every role named by a grouping", body = RoleListResponse))
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<RoleListResponse>, ApiError> {
    let roles = state
        .authz
        .list_roles()
        .await
        .map_err(|err| api_authz("failed to list roles", &err))?;
    Ok(Json(RoleListResponse { roles }))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{role}",
    tag = "roles",
    params(("role" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Role, its assignments and its grants removed", body = MutationResponse),
        (status = 404, description = "Nothing referenced the role", body = ErrorResponse)
    )
)]
pub async fn delete_role(
    Path(role): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MutationResponse>, ApiError> {
    let changed = state
        .authz
        .delete_role(&role)
        .await
        .map_err(|err| api_authz("failed to delete role", &err))?;
    if !changed {
        return Err(api_not_found("role not found"));
    }
    Ok(Json(MutationResponse { changed }))
}

#[utoipa::path(
    get,
    path = "/v1/roles/permissions",
    tag = "roles",
    params(("roles" = String, Query, description = "Comma-separated role names")),
    responses((status = 200, description = "Grants grouped by role", body = RolePermissionsResponse))
)]
pub async fn role_permissions(
    State(state): State<AppState>,
    Query(query): Query<RolePermissionsQuery>,
) -> Result<Json<RolePermissionsResponse>, ApiError> {
    let roles = split_list(&query.roles);
    let listing = state
        .authz
        .role_permissions(&roles)
        .await
        .map_err(|err| api_authz("failed to list role permissions", &err))?;
    let items = listing
        .into_iter()
        .map(|entry| RolePermissionsView {
            actions: permission_map(&entry.permissions),
            role: entry.role,
            permissions: entry
                .permissions
                .into_iter()
                .map(|perm| PermissionView {
                    name: perm.name,
                    title: perm.title,
                    operations: perm.operations,
                })
                .collect(),
        })
        .collect();
    Ok(Json(RolePermissionsResponse { items }))
}
