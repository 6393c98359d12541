use backstage_api::app::{AppState, build_router};
use backstage_authz::policy_store::memory::InMemoryPolicyStore;
use backstage_authz::{AuthzConfig, AuthzContext, GroupingRule, PolicyRule};
use std::sync::Arc;
use std::time::Duration;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Router over the built-in menu with `clerk` reading invoices and `alice`
/// holding `clerk`.
pub async fn seeded_app(super_user: &str) -> axum::Router {
    let store = Arc::new(InMemoryPolicyStore::seeded(
        vec![PolicyRule::new("clerk", "finance/invoice", "read,update")],
        vec![GroupingRule::new("alice", "clerk")],
    ));
    let config = AuthzConfig {
        super_user: super_user.to_string(),
        menu_refresh: Duration::from_secs(3600),
        ..AuthzConfig::default()
    };
    let authz = AuthzContext::initialize(config, store)
        .await
        .expect("authz context");
    build_router(AppState {
        authz: Arc::new(authz),
    })
}
