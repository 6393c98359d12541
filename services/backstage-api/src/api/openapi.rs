//! OpenAPI document for the HTTP API, served at `/v1/openapi.json`.
use crate::api::types::{
    ErrorResponse, HealthStatus, MenuReloadResponse, MenuResponse, MutationResponse,
    OperationsResponse, PermissionCheckResponse, PermissionGrantRequest, PermissionView,
    RoleAssignRequest, RoleListResponse, RolePermissionsResponse, RolePermissionsView,
    RoleReconcileRequest, UserRolesResponse,
};
use crate::api::{menu, permissions, roles, system};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "backstage-api",
        version = "v1",
        description = "Backstage menu authorization API"
    ),
    paths(
        system::system_health,
        menu::get_menu,
        menu::reload_menu,
        menu::user_menu,
        permissions::check_permission,
        permissions::user_operations,
        permissions::grant_permission,
        permissions::revoke_permission,
        roles::get_user_roles,
        roles::reconcile_user_roles,
        roles::assign_role,
        roles::unassign_role,
        roles::list_roles,
        roles::delete_role,
        roles::role_permissions
    ),
    components(schemas(
        ErrorResponse,
        HealthStatus,
        MenuResponse,
        MenuReloadResponse,
        PermissionCheckResponse,
        OperationsResponse,
        PermissionGrantRequest,
        MutationResponse,
        UserRolesResponse,
        RoleAssignRequest,
        RoleReconcileRequest,
        RoleListResponse,
        PermissionView,
        RolePermissionsView,
        RolePermissionsResponse
    )),
    tags(
        (name = "system", description = "Health"),
        (name = "menu", description = "Menu definition and per-user menus"),
        (name = "permissions", description = "Checks and grants"),
        (name = "roles", description = "Role assignment")
    )
)]
pub struct ApiDoc;
