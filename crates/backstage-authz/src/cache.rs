//! Per-user pruned menus with one shared refresh clock.
//!
//! # Key invariants
//! - An entry is served only while the shared next-refresh instant is in the
//!   future. Any miss recomputes that user's menu and pushes the shared
//!   instant to `now + ttl`, which also extends the life of every other
//!   user's entry.
//! - The lock is never held across the recomputation. Two concurrent misses
//!   for the same user both compute and the last write wins.
//! - A new cache starts expired, so the first lookup always computes.
//! - [`UserMenuCache::invalidate`] bumps a generation counter. A miss that
//!   started before the bump drops its result instead of storing it.
use crate::filter::filter_menu;
use crate::manager::PermissionManager;
use crate::menu::{MenuNode, MenuStore};
use crate::AuthzResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct CacheState {
    entries: HashMap<String, Vec<MenuNode>>,
    next_refresh: Instant,
    generation: u64,
}

#[derive(Debug)]
pub struct UserMenuCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl UserMenuCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_refresh: Instant::now(),
                generation: 0,
            }),
        }
    }

    /// Cached menu for `user`, recomputed from the full tree when missing or
    /// stale.
    pub async fn get_menu(
        &self,
        user: &str,
        manager: &PermissionManager,
        menu: &MenuStore,
    ) -> AuthzResult<Vec<MenuNode>> {
        let generation = match self.lookup(user) {
            Ok(hit) => {
                metrics::counter!("backstage_menu_cache_total", "result" => "hit").increment(1);
                return Ok(hit);
            }
            Err(generation) => generation,
        };
        metrics::counter!("backstage_menu_cache_total", "result" => "miss").increment(1);

        let tree = menu.tree();
        let pruned = filter_menu(manager, &tree, "", user).await?;
        if self.store(user, pruned.clone(), generation) {
            tracing::debug!(user, nodes = pruned.len(), "user menu refreshed");
        } else {
            tracing::debug!(user, "cache invalidated during refresh, result not stored");
        }
        Ok(pruned)
    }

    /// Drop every entry and expire the shared clock.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.next_refresh = Instant::now();
        state.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entry, or the generation a recomputation must be stored under.
    fn lookup(&self, user: &str) -> Result<Vec<MenuNode>, u64> {
        let state = self.state.lock();
        if Instant::now() < state.next_refresh {
            if let Some(hit) = state.entries.get(user) {
                return Ok(hit.clone());
            }
        }
        Err(state.generation)
    }

    fn store(&self, user: &str, menu: Vec<MenuNode>, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        state.entries.insert(user.to_string(), menu);
        state.next_refresh = Instant::now() + self.ttl;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casbin_model::casbin_model_string;
    use crate::engine::PolicyEngine;
    use crate::policy_store::memory::InMemoryPolicyStore;
    use crate::policy_store::{GroupingRule, PolicyRule};
    use crate::Action;
    use std::sync::Arc;

    const MENU: &str = r#"[
        {"id": 1, "title": "Dashboard", "name": "dashboard", "enable": true},
        {"id": 2, "title": "Finance", "name": "finance", "enable": true, "children": [
            {"id": 3, "title": "Invoices", "name": "invoice", "enable": true}
        ]}
    ]"#;

    const TTL: Duration = Duration::from_secs(30);

    async fn fixture() -> (PermissionManager, Arc<MenuStore>) {
        let store = Arc::new(InMemoryPolicyStore::seeded(
            vec![PolicyRule::new("clerk", "finance/invoice", "read")],
            vec![
                GroupingRule::new("alice", "clerk"),
                GroupingRule::new("bob", "clerk"),
            ],
        ));
        let engine = PolicyEngine::initialize(casbin_model_string(), store)
            .await
            .expect("engine");
        let menu = Arc::new(MenuStore::from_json(MENU.as_bytes()).expect("menu"));
        (
            PermissionManager::new(Arc::new(engine), menu.clone(), ""),
            menu,
        )
    }

    fn leaf_names(nodes: &[MenuNode]) -> Vec<String> {
        nodes
            .iter()
            .flat_map(|node| {
                if node.is_leaf() {
                    vec![node.name.clone()]
                } else {
                    leaf_names(&node.children)
                }
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn serves_stale_entry_within_ttl_and_refreshes_after() {
        let (manager, menu) = fixture().await;
        let cache = UserMenuCache::new(TTL);

        let first = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        assert_eq!(leaf_names(&first), vec!["invoice"]);

        manager
            .grant_permission("clerk", "dashboard", &[Action::Read])
            .await
            .expect("grant");
        let cached = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        assert_eq!(cached, first);

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        let refreshed = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        assert_eq!(leaf_names(&refreshed), vec!["dashboard", "invoice"]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_users_miss_extends_everyones_entries() {
        let (manager, menu) = fixture().await;
        let cache = UserMenuCache::new(TTL);

        let alice_before = cache.get_menu("alice", &manager, &menu).await.expect("alice");
        tokio::time::advance(TTL / 2).await;
        manager
            .grant_permission("clerk", "dashboard", &[Action::Read])
            .await
            .expect("grant");

        // A miss for bob resets the shared clock.
        let bob = cache.get_menu("bob", &manager, &menu).await.expect("bob");
        assert_eq!(leaf_names(&bob), vec!["dashboard", "invoice"]);

        tokio::time::advance(TTL * 3 / 4).await;
        let alice_after = cache.get_menu("alice", &manager, &menu).await.expect("alice");
        assert_eq!(alice_after, alice_before);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_recompute() {
        let (manager, menu) = fixture().await;
        let cache = UserMenuCache::new(TTL);
        assert!(cache.is_empty());

        cache.get_menu("alice", &manager, &menu).await.expect("menu");
        menu.reload(br#"[{"id": 9, "title": "Invoices", "name": "invoice", "enable": true}]"#)
            .expect("reload");
        cache.invalidate();
        assert!(cache.is_empty());

        let after = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_always_recomputes() {
        let (manager, menu) = fixture().await;
        let cache = UserMenuCache::new(Duration::ZERO);
        let first = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        manager
            .revoke_permission("clerk", "finance/invoice", &[Action::Read])
            .await
            .expect("revoke");
        let second = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        assert_eq!(leaf_names(&first), vec!["invoice"]);
        assert!(second.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_started_before_invalidate_is_not_stored() {
        let (manager, menu) = fixture().await;
        let cache = UserMenuCache::new(TTL);

        let generation = cache.lookup("alice").expect_err("cold cache");
        let computed = filter_menu(&manager, &menu.tree(), "", "alice")
            .await
            .expect("filter");
        manager
            .revoke_permission("clerk", "finance/invoice", &[Action::Read])
            .await
            .expect("revoke");
        cache.invalidate();

        assert!(!cache.store("alice", computed, generation));
        assert!(cache.is_empty());
        let after = cache.get_menu("alice", &manager, &menu).await.expect("menu");
        assert!(after.is_empty());
    }
}
