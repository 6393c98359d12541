//! In-memory policy store.
//!
//! Keeps rows in insertion order behind Tokio locks. Nothing survives a
//! restart; use the Postgres backend when policy must be shared or durable.
use super::{GroupingRule, PolicyRule, PolicyStore, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
pub struct InMemoryPolicyStore {
    policies: Arc<RwLock<Vec<PolicyRule>>>,
    groupings: Arc<RwLock<Vec<GroupingRule>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with rows, skipping duplicates.
    pub fn seeded(policies: Vec<PolicyRule>, groupings: Vec<GroupingRule>) -> Self {
        let mut unique_policies: Vec<PolicyRule> = Vec::with_capacity(policies.len());
        for policy in policies {
            if !unique_policies.contains(&policy) {
                unique_policies.push(policy);
            }
        }
        let mut unique_groupings: Vec<GroupingRule> = Vec::with_capacity(groupings.len());
        for grouping in groupings {
            if !unique_groupings.contains(&grouping) {
                unique_groupings.push(grouping);
            }
        }
        Self {
            policies: Arc::new(RwLock::new(unique_policies)),
            groupings: Arc::new(RwLock::new(unique_groupings)),
        }
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn list_policies(&self) -> StoreResult<Vec<PolicyRule>> {
        Ok(self.policies.read().await.clone())
    }

    async fn list_groupings(&self) -> StoreResult<Vec<GroupingRule>> {
        Ok(self.groupings.read().await.clone())
    }

    async fn add_policies(&self, rules: Vec<PolicyRule>) -> StoreResult<bool> {
        let mut policies = self.policies.write().await;
        let mut added = false;
        for rule in rules {
            if !policies.contains(&rule) {
                policies.push(rule);
                added = true;
            }
        }
        Ok(added)
    }

    async fn remove_policy(&self, rule: &PolicyRule) -> StoreResult<bool> {
        let mut policies = self.policies.write().await;
        let before = policies.len();
        policies.retain(|existing| existing != rule);
        Ok(policies.len() != before)
    }

    async fn add_groupings(&self, groupings: Vec<GroupingRule>) -> StoreResult<bool> {
        let mut existing = self.groupings.write().await;
        let mut added = false;
        for grouping in groupings {
            if !existing.contains(&grouping) {
                existing.push(grouping);
                added = true;
            }
        }
        Ok(added)
    }

    async fn remove_grouping(&self, grouping: &GroupingRule) -> StoreResult<bool> {
        let mut groupings = self.groupings.write().await;
        let before = groupings.len();
        groupings.retain(|existing| existing != grouping);
        Ok(groupings.len() != before)
    }

    async fn remove_groupings_for_user(&self, user: &str) -> StoreResult<bool> {
        let mut groupings = self.groupings.write().await;
        let before = groupings.len();
        groupings.retain(|existing| existing.user != user);
        Ok(groupings.len() != before)
    }

    async fn remove_role(&self, role: &str) -> StoreResult<bool> {
        let removed_groupings = {
            let mut groupings = self.groupings.write().await;
            let before = groupings.len();
            groupings.retain(|existing| existing.role != role && existing.user != role);
            groupings.len() != before
        };
        let mut policies = self.policies.write().await;
        let before = policies.len();
        policies.retain(|existing| existing.subject != role);
        Ok(removed_groupings || policies.len() != before)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
