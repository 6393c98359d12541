//! Casbin enforcer wrapper with store-first mutations.
//!
//! # Purpose and responsibility
//! Owns the casbin [`Enforcer`], loads the enforcement model, registers the
//! action-set matcher, and exposes enforce/mutate/query primitives over
//! `(subject, object, action)` triples.
//!
//! # Key invariants and assumptions
//! - The [`PolicyStore`] is authoritative. Every mutation writes the store
//!   first and then reloads the enforcer's whole policy from it.
//! - A write and its reload run under one engine-wide mutex, so a reload never
//!   observes another caller's half-applied change.
//! - If the reload fails the mutation reports failure even though the store
//!   already holds the change. Nothing is retried here.
//! - The super-user bypass is not applied at this layer.
use crate::casbin_model::load_model;
use crate::errors::{EngineError, EngineResult};
use crate::matcher::{ACTION_MATCH_FN, action_set_match};
use crate::policy_store::{GroupingRule, PolicyRule, PolicyStore};
use crate::{Action, AuthzResult};
use casbin::function_map::OperatorFunction;
use casbin::{CoreApi, Enforcer, MemoryAdapter, MgmtApi, RbacApi};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct PolicyEngine {
    enforcer: RwLock<Enforcer>,
    store: Arc<dyn PolicyStore>,
    mutation: Mutex<()>,
}

impl PolicyEngine {
    /// Load `model_definition`, register the matcher, and pull all policy
    /// from `store`.
    ///
    /// # Errors
    /// - Malformed model text or a store that cannot be read.
    pub async fn initialize(
        model_definition: &str,
        store: Arc<dyn PolicyStore>,
    ) -> AuthzResult<Self> {
        let model = load_model(model_definition).await?;
        let mut enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .map_err(EngineError::from)?;
        register_action_set_matcher(&mut enforcer);

        let engine = Self {
            enforcer: RwLock::new(enforcer),
            store,
            mutation: Mutex::new(()),
        };
        engine.reload_locked().await?;
        tracing::info!(
            backend = engine.store.backend_name(),
            "policy engine initialized"
        );
        Ok(engine)
    }

    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    /// Replace the enforcer's in-memory policy with the store's contents.
    ///
    /// Serialized with mutations, so a reload that read the store before a
    /// write cannot overwrite the policy that write installed.
    pub async fn reload(&self) -> EngineResult<()> {
        let _serialized = self.mutation.lock().await;
        self.reload_locked().await
    }

    /// Caller holds `self.mutation` or owns the engine exclusively.
    async fn reload_locked(&self) -> EngineResult<()> {
        let policies = self.store.list_policies().await?;
        let groupings = self.store.list_groupings().await?;
        let (policy_count, grouping_count) = (policies.len(), groupings.len());

        let mut enforcer = self.enforcer.write().await;
        enforcer.clear_policy().await?;
        if !policies.is_empty() {
            enforcer
                .add_policies(policies.into_iter().map(PolicyRule::into_casbin).collect())
                .await?;
        }
        if !groupings.is_empty() {
            enforcer
                .add_grouping_policies(
                    groupings
                        .into_iter()
                        .map(GroupingRule::into_casbin)
                        .collect(),
                )
                .await?;
        }
        enforcer.build_role_links()?;
        tracing::debug!(
            policies = policy_count,
            groupings = grouping_count,
            "policy reloaded"
        );
        Ok(())
    }

    pub async fn enforce(&self, subject: &str, object: &str, action: Action) -> EngineResult<bool> {
        let enforcer = self.enforcer.read().await;
        Ok(enforcer.enforce((subject, object, action.as_str()))?)
    }

    pub async fn add_permission(&self, role: &str, object: &str, actions: &str) -> EngineResult<bool> {
        self.add_permissions(role, &[(object.to_string(), actions.to_string())])
            .await
    }

    /// Store several `(object, action-field)` grants for `role` in one write.
    pub async fn add_permissions(
        &self,
        role: &str,
        grants: &[(String, String)],
    ) -> EngineResult<bool> {
        let rules = grants
            .iter()
            .map(|(object, actions)| PolicyRule::new(role, object.as_str(), actions.as_str()))
            .collect();
        let _serialized = self.mutation.lock().await;
        let changed = self.store.add_policies(rules).await?;
        self.finish_mutation("add_permissions", changed).await
    }

    pub async fn delete_permission(
        &self,
        role: &str,
        object: &str,
        actions: &str,
    ) -> EngineResult<bool> {
        let rule = PolicyRule::new(role, object, actions);
        let _serialized = self.mutation.lock().await;
        let changed = self.store.remove_policy(&rule).await?;
        self.finish_mutation("delete_permission", changed).await
    }

    pub async fn add_role_for_user(&self, user: &str, role: &str) -> EngineResult<bool> {
        self.add_roles_for_user(user, &[role.to_string()]).await
    }

    pub async fn add_roles_for_user(&self, user: &str, roles: &[String]) -> EngineResult<bool> {
        let groupings = roles
            .iter()
            .map(|role| GroupingRule::new(user, role.as_str()))
            .collect();
        let _serialized = self.mutation.lock().await;
        let changed = self.store.add_groupings(groupings).await?;
        self.finish_mutation("add_roles_for_user", changed).await
    }

    pub async fn delete_role_for_user(&self, user: &str, role: &str) -> EngineResult<bool> {
        let grouping = GroupingRule::new(user, role);
        let _serialized = self.mutation.lock().await;
        let changed = self.store.remove_grouping(&grouping).await?;
        self.finish_mutation("delete_role_for_user", changed).await
    }

    /// Remove every role held by `user`.
    pub async fn delete_roles_for_user(&self, user: &str) -> EngineResult<bool> {
        let _serialized = self.mutation.lock().await;
        let changed = self.store.remove_groupings_for_user(user).await?;
        self.finish_mutation("delete_roles_for_user", changed).await
    }

    /// Remove a role: its grants and every assignment of it.
    pub async fn delete_role(&self, role: &str) -> EngineResult<bool> {
        let _serialized = self.mutation.lock().await;
        let changed = self.store.remove_role(role).await?;
        self.finish_mutation("delete_role", changed).await
    }

    /// Rules whose subject is exactly `subject` (no inheritance).
    pub async fn get_permissions_for_subject(&self, subject: &str) -> EngineResult<Vec<PolicyRule>> {
        let enforcer = self.enforcer.read().await;
        Ok(enforcer
            .get_permissions_for_user(subject, None)
            .into_iter()
            .filter_map(|mut row| {
                if row.len() < 3 {
                    return None;
                }
                let action = row.swap_remove(2);
                let object = row.swap_remove(1);
                let subject = row.swap_remove(0);
                Some(PolicyRule {
                    subject,
                    object,
                    action,
                })
            })
            .collect())
    }

    /// Roles assigned directly to `subject`.
    pub async fn get_roles_for_subject(&self, subject: &str) -> EngineResult<Vec<String>> {
        // Role-manager lookups take `&mut self` on the enforcer.
        let mut enforcer = self.enforcer.write().await;
        Ok(enforcer.get_roles_for_user(subject, None))
    }

    pub async fn get_all_roles(&self) -> EngineResult<Vec<String>> {
        let enforcer = self.enforcer.read().await;
        Ok(enforcer.get_all_roles())
    }

    async fn finish_mutation(&self, op: &'static str, changed: bool) -> EngineResult<bool> {
        metrics::counter!("backstage_policy_mutations_total", "op" => op).increment(1);
        if let Err(err) = self.reload_locked().await {
            tracing::warn!(op, error = %err, "policy stored but enforcer reload failed");
            return Err(err);
        }
        tracing::debug!(op, changed, "policy mutation applied");
        Ok(changed)
    }
}

/// Install `actionMatch(r.act, p.act)` on the enforcer.
pub fn register_action_set_matcher(enforcer: &mut Enforcer) {
    enforcer.add_function(
        ACTION_MATCH_FN,
        OperatorFunction::Arg2(|requested, stored| {
            action_set_match(&requested.to_string(), &stored.to_string()).into()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casbin_model::casbin_model_string;
    use crate::policy_store::StoreResult;
    use crate::policy_store::memory::InMemoryPolicyStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Holds the next `list_groupings` call until `release` is notified.
    struct GatedStore {
        inner: InMemoryPolicyStore,
        armed: AtomicBool,
        reached: Notify,
        release: Notify,
    }

    impl GatedStore {
        fn new(inner: InMemoryPolicyStore) -> Self {
            Self {
                inner,
                armed: AtomicBool::new(false),
                reached: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl PolicyStore for GatedStore {
        async fn list_policies(&self) -> StoreResult<Vec<PolicyRule>> {
            self.inner.list_policies().await
        }
        async fn list_groupings(&self) -> StoreResult<Vec<GroupingRule>> {
            let groupings = self.inner.list_groupings().await;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            groupings
        }
        async fn add_policies(&self, rules: Vec<PolicyRule>) -> StoreResult<bool> {
            self.inner.add_policies(rules).await
        }
        async fn remove_policy(&self, rule: &PolicyRule) -> StoreResult<bool> {
            self.inner.remove_policy(rule).await
        }
        async fn add_groupings(&self, groupings: Vec<GroupingRule>) -> StoreResult<bool> {
            self.inner.add_groupings(groupings).await
        }
        async fn remove_grouping(&self, grouping: &GroupingRule) -> StoreResult<bool> {
            self.inner.remove_grouping(grouping).await
        }
        async fn remove_groupings_for_user(&self, user: &str) -> StoreResult<bool> {
            self.inner.remove_groupings_for_user(user).await
        }
        async fn remove_role(&self, role: &str) -> StoreResult<bool> {
            self.inner.remove_role(role).await
        }
        async fn health_check(&self) -> StoreResult<()> {
            Ok(())
        }
        fn is_durable(&self) -> bool {
            false
        }
        fn backend_name(&self) -> &'static str {
            "gated"
        }
    }

    async fn engine_with(
        policies: Vec<PolicyRule>,
        groupings: Vec<GroupingRule>,
    ) -> PolicyEngine {
        let store = Arc::new(InMemoryPolicyStore::seeded(policies, groupings));
        PolicyEngine::initialize(casbin_model_string(), store)
            .await
            .expect("engine")
    }

    #[tokio::test]
    async fn enforce_matches_action_sets() {
        let engine = engine_with(
            vec![PolicyRule::new("clerk", "finance/invoice", "read,update")],
            vec![GroupingRule::new("alice", "clerk")],
        )
        .await;

        assert!(engine.enforce("alice", "finance/invoice", Action::Read).await.expect("read"));
        assert!(engine.enforce("alice", "finance/invoice", Action::Update).await.expect("update"));
        assert!(!engine.enforce("alice", "finance/invoice", Action::Delete).await.expect("delete"));
        assert!(!engine.enforce("alice", "finance/ledger", Action::Read).await.expect("other object"));
        assert!(!engine.enforce("bob", "finance/invoice", Action::Read).await.expect("no role"));
        assert!(engine.enforce("clerk", "finance/invoice", Action::Read).await.expect("role itself"));
    }

    #[tokio::test]
    async fn role_hierarchy_is_transitive() {
        let engine = engine_with(
            vec![PolicyRule::new("viewer", "dashboard", "read")],
            vec![
                GroupingRule::new("manager", "viewer"),
                GroupingRule::new("carol", "manager"),
            ],
        )
        .await;
        assert!(engine.enforce("carol", "dashboard", Action::Read).await.expect("enforce"));
    }

    #[tokio::test]
    async fn mutations_are_visible_immediately() {
        let engine = engine_with(vec![], vec![GroupingRule::new("alice", "clerk")]).await;
        assert!(!engine.enforce("alice", "finance/invoice", Action::Read).await.expect("before"));

        assert!(engine.add_permission("clerk", "finance/invoice", "read").await.expect("add"));
        assert!(engine.enforce("alice", "finance/invoice", Action::Read).await.expect("after add"));
        assert!(!engine.add_permission("clerk", "finance/invoice", "read").await.expect("dup"));

        assert!(engine.delete_permission("clerk", "finance/invoice", "read").await.expect("delete"));
        assert!(!engine.enforce("alice", "finance/invoice", Action::Read).await.expect("after delete"));
    }

    #[tokio::test]
    async fn role_assignment_roundtrip() {
        let engine = engine_with(
            vec![PolicyRule::new("clerk", "finance/invoice", "read")],
            vec![],
        )
        .await;

        assert!(engine
            .add_roles_for_user("alice", &["clerk".to_string(), "auditor".to_string()])
            .await
            .expect("add roles"));
        let mut roles = engine.get_roles_for_subject("alice").await.expect("roles");
        roles.sort();
        assert_eq!(roles, vec!["auditor", "clerk"]);
        assert!(engine.enforce("alice", "finance/invoice", Action::Read).await.expect("enforce"));

        assert!(engine.delete_role_for_user("alice", "clerk").await.expect("delete"));
        assert_eq!(
            engine.get_roles_for_subject("alice").await.expect("roles"),
            vec!["auditor"]
        );
        assert!(!engine.enforce("alice", "finance/invoice", Action::Read).await.expect("enforce"));

        assert!(engine.delete_roles_for_user("alice").await.expect("delete all"));
        assert!(engine.get_roles_for_subject("alice").await.expect("roles").is_empty());
    }

    #[tokio::test]
    async fn queries_report_direct_permissions_and_roles() {
        let engine = engine_with(
            vec![
                PolicyRule::new("clerk", "finance/invoice", "read"),
                PolicyRule::new("clerk", "finance/withdrawal", "read,update"),
                PolicyRule::new("auditor", "finance/invoice", "read"),
            ],
            vec![
                GroupingRule::new("alice", "clerk"),
                GroupingRule::new("bob", "auditor"),
            ],
        )
        .await;

        let perms = engine.get_permissions_for_subject("clerk").await.expect("perms");
        assert_eq!(perms.len(), 2);
        assert!(perms.contains(&PolicyRule::new("clerk", "finance/withdrawal", "read,update")));
        assert!(engine.get_permissions_for_subject("alice").await.expect("perms").is_empty());

        let mut all = engine.get_all_roles().await.expect("roles");
        all.sort();
        assert_eq!(all, vec!["auditor", "clerk"]);
    }

    #[tokio::test]
    async fn delete_role_drops_grants_and_assignments() {
        let engine = engine_with(
            vec![PolicyRule::new("clerk", "finance/invoice", "read")],
            vec![GroupingRule::new("alice", "clerk")],
        )
        .await;
        assert!(engine.delete_role("clerk").await.expect("delete role"));
        assert!(engine.get_all_roles().await.expect("roles").is_empty());
        assert!(engine.get_permissions_for_subject("clerk").await.expect("perms").is_empty());
        assert!(!engine.enforce("alice", "finance/invoice", Action::Read).await.expect("enforce"));
    }

    #[tokio::test]
    async fn engine_reads_writes_made_directly_to_store_after_reload() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let engine = PolicyEngine::initialize(casbin_model_string(), store.clone())
            .await
            .expect("engine");
        store
            .add_policies(vec![PolicyRule::new("bob", "dashboard", "read")])
            .await
            .expect("store write");
        assert!(!engine.enforce("bob", "dashboard", Action::Read).await.expect("stale"));
        engine.reload().await.expect("reload");
        assert!(engine.enforce("bob", "dashboard", Action::Read).await.expect("fresh"));
    }

    #[tokio::test]
    async fn reload_in_flight_does_not_drop_a_concurrent_grant() {
        let store = Arc::new(GatedStore::new(InMemoryPolicyStore::seeded(
            vec![],
            vec![GroupingRule::new("alice", "clerk")],
        )));
        let engine = Arc::new(
            PolicyEngine::initialize(casbin_model_string(), store.clone())
                .await
                .expect("engine"),
        );

        store.armed.store(true, Ordering::SeqCst);
        let reload = tokio::spawn({
            let engine = engine.clone();
            async move { engine.reload().await }
        });
        store.reached.notified().await;

        let grant = tokio::spawn({
            let engine = engine.clone();
            async move { engine.add_permission("clerk", "finance/invoice", "read").await }
        });
        tokio::task::yield_now().await;
        store.release.notify_one();

        reload.await.expect("join").expect("reload");
        assert!(grant.await.expect("join").expect("grant"));
        assert!(engine.enforce("alice", "finance/invoice", Action::Read).await.expect("enforce"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_grants_are_all_enforceable() {
        let engine = Arc::new(
            engine_with(vec![], vec![GroupingRule::new("alice", "clerk")]).await,
        );
        let mut tasks = Vec::new();
        for i in 0..16 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    engine.reload().await.map(|_| true)
                } else {
                    engine.add_permission("clerk", &format!("reports/r{i}"), "read").await
                }
            }));
        }
        for task in tasks {
            task.await.expect("join").expect("mutation");
        }
        for i in (0..16).filter(|i| i % 4 != 0) {
            let object = format!("reports/r{i}");
            assert!(
                engine.enforce("alice", &object, Action::Read).await.expect("enforce"),
                "{object}"
            );
        }
    }
}
