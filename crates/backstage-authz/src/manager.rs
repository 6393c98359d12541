//! Role and permission management on top of [`PolicyEngine`].
//!
//! # Purpose and responsibility
//! Composes engine primitives into the operations the back office needs:
//! granting action sets to roles, reconciling a user's roles to a target set,
//! aggregating role grants for display, and probing which actions a user
//! holds on a menu permission key.
//!
//! # Key invariants and assumptions
//! - The configured super-user bypass in [`PermissionManager::has_permission`]
//!   is the only place enforcement is skipped.
//! - Action fields written through this module are canonical (see
//!   [`normalize_action_order`]), so grants for the same action set compare
//!   equal.
use crate::engine::PolicyEngine;
use crate::menu::MenuStore;
use crate::policy_store::PolicyRule;
use crate::{Action, AuthzError, AuthzResult, join_actions, normalize_action_order};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// A role's grant on one object, with every action gathered from its tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionObj {
    pub name: String,
    pub title: String,
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
    pub role: String,
    pub permissions: Vec<PermissionObj>,
}

pub struct PermissionManager {
    engine: Arc<PolicyEngine>,
    menu: Arc<MenuStore>,
    super_user: Option<String>,
}

impl PermissionManager {
    /// An empty `super_user` disables the bypass.
    pub fn new(engine: Arc<PolicyEngine>, menu: Arc<MenuStore>, super_user: &str) -> Self {
        let super_user = (!super_user.is_empty()).then(|| super_user.to_string());
        Self {
            engine,
            menu,
            super_user,
        }
    }

    pub fn engine(&self) -> &Arc<PolicyEngine> {
        &self.engine
    }

    pub fn is_super_user(&self, subject: &str) -> bool {
        self.super_user.as_deref() == Some(subject)
    }

    pub async fn has_permission(
        &self,
        subject: &str,
        object: &str,
        action: Action,
    ) -> AuthzResult<bool> {
        metrics::counter!("backstage_permission_checks_total").increment(1);
        if self.is_super_user(subject) {
            return Ok(true);
        }
        Ok(self.engine.enforce(subject, object, action).await?)
    }

    pub async fn grant_permission(
        &self,
        role: &str,
        object: &str,
        actions: &[Action],
    ) -> AuthzResult<bool> {
        Ok(self
            .engine
            .add_permission(role, object, &join_actions(actions))
            .await?)
    }

    pub async fn grant_permissions(
        &self,
        role: &str,
        grants: &[(String, Vec<Action>)],
    ) -> AuthzResult<bool> {
        let grants: Vec<(String, String)> = grants
            .iter()
            .map(|(object, actions)| (object.clone(), join_actions(actions)))
            .collect();
        Ok(self.engine.add_permissions(role, &grants).await?)
    }

    /// Remove the grant whose action field equals the canonical form of
    /// `actions`.
    pub async fn revoke_permission(
        &self,
        role: &str,
        object: &str,
        actions: &[Action],
    ) -> AuthzResult<bool> {
        Ok(self
            .engine
            .delete_permission(role, object, &join_actions(actions))
            .await?)
    }

    pub async fn assign_role(&self, user: &str, role: &str) -> AuthzResult<bool> {
        Ok(self.engine.add_role_for_user(user, role).await?)
    }

    pub async fn unassign_role(&self, user: &str, role: &str) -> AuthzResult<bool> {
        Ok(self.engine.delete_role_for_user(user, role).await?)
    }

    pub async fn roles_for_user(&self, user: &str) -> AuthzResult<Vec<String>> {
        Ok(self.engine.get_roles_for_subject(user).await?)
    }

    pub async fn all_roles(&self) -> AuthzResult<Vec<String>> {
        Ok(self.engine.get_all_roles().await?)
    }

    pub async fn delete_role(&self, role: &str) -> AuthzResult<bool> {
        Ok(self.engine.delete_role(role).await?)
    }

    /// Make `user`'s direct roles equal `target`.
    ///
    /// Missing roles are added in one batch; extra roles are removed one at a
    /// time. A failed removal stops immediately and reports what was already
    /// applied; nothing is rolled back.
    pub async fn reconcile_user_roles(&self, user: &str, target: &[String]) -> AuthzResult<bool> {
        let current = self.engine.get_roles_for_subject(user).await?;
        let to_add = difference(target, &current);
        let to_remove = difference(&current, target);

        if !to_add.is_empty() {
            self.engine.add_roles_for_user(user, &to_add).await?;
        }

        let mut removed = Vec::with_capacity(to_remove.len());
        for role in to_remove {
            if let Err(source) = self.engine.delete_role_for_user(user, &role).await {
                tracing::warn!(user, role = %role, error = %source, "role reconciliation aborted");
                return Err(AuthzError::PartialReconciliation {
                    user: user.to_string(),
                    added: to_add,
                    removed,
                    failed_role: role,
                    source,
                });
            }
            removed.push(role);
        }
        tracing::debug!(user, added = ?to_add, removed = ?removed, "roles reconciled");
        Ok(true)
    }

    /// Concatenate the direct grants of every role. Any failed lookup fails
    /// the whole call.
    pub async fn aggregate_permissions(&self, roles: &[String]) -> AuthzResult<Vec<PolicyRule>> {
        let mut rules = Vec::new();
        for role in roles {
            rules.extend(self.engine.get_permissions_for_subject(role).await?);
        }
        Ok(rules)
    }

    /// Group rules by role, merging rules for the same object. Operations are
    /// concatenated as found; titles come from the menu's title index.
    pub fn group_permissions_by_role(
        &self,
        rules: &[PolicyRule],
    ) -> BTreeMap<String, Vec<PermissionObj>> {
        group_permissions(rules, &self.menu.title_index())
    }

    /// Grouped grants for `roles`, ordered by role name.
    pub async fn role_permissions(&self, roles: &[String]) -> AuthzResult<Vec<RolePermissions>> {
        let mut unique: Vec<String> = roles
            .iter()
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        unique.sort();
        let rules = self.aggregate_permissions(&unique).await?;
        let mut grouped = self.group_permissions_by_role(&rules);
        Ok(unique
            .into_iter()
            .map(|role| {
                let permissions = grouped.remove(&role).unwrap_or_default();
                RolePermissions { role, permissions }
            })
            .collect())
    }

    /// Actions `user` holds on `object`, in canonical order.
    pub async fn list_operations_held(&self, user: &str, object: &str) -> AuthzResult<Vec<Action>> {
        let mut held = Vec::new();
        for action in Action::ALL {
            if self.has_permission(user, object, action).await? {
                held.push(action);
            }
        }
        Ok(held)
    }
}

pub fn group_permissions(
    rules: &[PolicyRule],
    titles: &HashMap<String, String>,
) -> BTreeMap<String, Vec<PermissionObj>> {
    let mut grouped: BTreeMap<String, Vec<PermissionObj>> = BTreeMap::new();
    for rule in rules {
        let operations: Vec<String> = if rule.action.is_empty() {
            Vec::new()
        } else {
            rule.action.split(',').map(str::to_string).collect()
        };
        let entry = grouped.entry(rule.subject.clone()).or_default();
        match entry.iter_mut().find(|perm| perm.name == rule.object) {
            Some(existing) => existing.operations.extend(operations),
            None => entry.push(PermissionObj {
                name: rule.object.clone(),
                title: titles.get(&rule.object).cloned().unwrap_or_default(),
                operations,
            }),
        }
    }
    grouped
}

/// Object name to canonical action field.
pub fn permission_map(permissions: &[PermissionObj]) -> BTreeMap<String, String> {
    permissions
        .iter()
        .map(|perm| (perm.name.clone(), normalize_action_order(&perm.operations)))
        .collect()
}

/// Elements of `left` missing from `right`, in `left` order, without repeats.
fn difference(left: &[String], right: &[String]) -> Vec<String> {
    let exclude: HashSet<&str> = right.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    left.iter()
        .filter(|item| !exclude.contains(item.as_str()) && seen.insert(item.as_str()))
        .cloned()
        .collect()
}
