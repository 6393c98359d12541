//! Menu handlers.
//!
//! # Purpose
//! Serves the full menu definition, the per-user pruned menu, and the reload
//! operation that swaps in a new definition.
use crate::api::error::{ApiError, api_authz};
use crate::api::require_non_empty;
use crate::api::types::{ErrorResponse, MenuReloadResponse, MenuResponse};
use crate::app::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

#[utoipa::path(
    get,
    path = "/v1/menu",
    tag = "menu",
    responses((status = 200, description = "Full menu tree", body = MenuResponse))
)]
pub async fn get_menu(State(state): State<AppState>) -> Json<MenuResponse> {
    Json(MenuResponse {
        menu: state.authz.menu().as_ref().clone(),
    })
}

#[utoipa::path(
    post,
    path = "/v1/menu/reload",
    tag = "menu",
    request_body(content = String, description = "Menu definition; empty body reloads the built-in menu"),
    responses(
        (status = 200, description = "Menu replaced", body = MenuReloadResponse),
        (status = 400, description = "Malformed definition", body = ErrorResponse)
    )
)]
pub async fn reload_menu(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MenuReloadResponse>, ApiError> {
    let definition = (!body.is_empty()).then_some(body.as_ref());
    state
        .authz
        .reload_menu(definition)
        .map_err(|err| api_authz("menu reload failed", &err))?;
    Ok(Json(MenuReloadResponse {
        nodes: state.authz.menu_store().node_count(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/users/{user}/menu",
    tag = "menu",
    params(("user" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Menu pruned to what the user may read", body = MenuResponse),
        (status = 500, description = "Permission lookup failed", body = ErrorResponse)
    )
)]
pub async fn user_menu(
    Path(user): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MenuResponse>, ApiError> {
    require_non_empty("user", &user)?;
    let menu = state
        .authz
        .user_menu(&user)
        .await
        .map_err(|err| api_authz("failed to build user menu", &err))?;
    Ok(Json(MenuResponse { menu }))
}
