//! Request and response bodies for the HTTP API.
use backstage_authz::MenuNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
    pub durable: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PermissionCheckQuery {
    pub user: String,
    pub menu: String,
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
    pub exists: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MenuResponse {
    #[schema(value_type = Vec<Object>)]
    pub menu: Vec<MenuNode>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MenuReloadResponse {
    pub nodes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OperationsQuery {
    pub object: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct OperationsResponse {
    pub user: String,
    pub object: String,
    pub operations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserRolesResponse {
    pub user: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleAssignRequest {
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleReconcileRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleListResponse {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RolePermissionsQuery {
    /// Comma-separated role names.
    pub roles: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionView {
    pub name: String,
    pub title: String,
    pub operations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RolePermissionsView {
    pub role: String,
    pub permissions: Vec<PermissionView>,
    /// Object key to canonical action field.
    pub actions: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RolePermissionsResponse {
    pub items: Vec<RolePermissionsView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionGrantRequest {
    pub object: String,
    pub actions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct MutationResponse {
    pub changed: bool,
}
