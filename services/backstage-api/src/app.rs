//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use axum::Json;
use axum::Router;
use axum::routing::{delete, get, post};
use backstage_authz::AuthzContext;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub authz: Arc<AuthzContext>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/v1/system/health", get(api::system::system_health))
        .route("/v1/permissions/check", get(api::permissions::check_permission))
        .route("/v1/menu", get(api::menu::get_menu))
        .route("/v1/menu/reload", post(api::menu::reload_menu))
        .route("/v1/users/:user/menu", get(api::menu::user_menu))
        .route(
            "/v1/users/:user/operations",
            get(api::permissions::user_operations),
        )
        .route(
            "/v1/users/:user/roles",
            get(api::roles::get_user_roles)
                .put(api::roles::reconcile_user_roles)
                .post(api::roles::assign_role),
        )
        .route(
            "/v1/users/:user/roles/:role",
            delete(api::roles::unassign_role),
        )
        .route("/v1/roles", get(api::roles::list_roles))
        .route("/v1/roles/permissions", get(api::roles::role_permissions))
        .route("/v1/roles/:role", delete(api::roles::delete_role))
        .route(
            "/v1/roles/:role/permissions",
            post(api::permissions::grant_permission).delete(api::permissions::revoke_permission),
        )
        .route(
            "/v1/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(trace_layer)
        .with_state(state)
}
