//! Process-wide authorization state.
//!
//! # Purpose
//! [`AuthzContext`] owns the menu store, policy engine, permission manager and
//! user menu cache. It is built once at startup and shared by `Arc`; there is
//! no global mutable state behind it.
//!
//! # Key invariants
//! - Every mutation made through the context, and every menu reload, empties
//!   the user menu cache so later lookups see the new state.
//! - Mutations made directly on the store or engine bypass that invalidation
//!   and become visible to cached menus only after the refresh interval.
use crate::cache::UserMenuCache;
use crate::casbin_model::casbin_model_string;
use crate::config::AuthzConfig;
use crate::engine::PolicyEngine;
use crate::manager::{PermissionManager, RolePermissions};
use crate::menu::{MenuNode, MenuStore};
use crate::policy_store::PolicyStore;
use crate::{Action, AuthzResult};
use serde::Serialize;
use std::sync::Arc;

/// Result of a permission check against a menu key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionCheck {
    pub allowed: bool,
    /// False when the request could not be evaluated at all, for example an
    /// unknown action name.
    pub exists: bool,
}

pub struct AuthzContext {
    config: AuthzConfig,
    menu: Arc<MenuStore>,
    engine: Arc<PolicyEngine>,
    manager: PermissionManager,
    cache: UserMenuCache,
}

impl AuthzContext {
    /// Load the embedded menu and model and pull policy from `store`.
    pub async fn initialize(config: AuthzConfig, store: Arc<dyn PolicyStore>) -> AuthzResult<Self> {
        let menu = Arc::new(MenuStore::embedded()?);
        Self::with_menu(config, store, menu).await
    }

    /// Same as [`AuthzContext::initialize`] with a caller-supplied menu.
    pub async fn with_menu(
        config: AuthzConfig,
        store: Arc<dyn PolicyStore>,
        menu: Arc<MenuStore>,
    ) -> AuthzResult<Self> {
        let engine = Arc::new(PolicyEngine::initialize(casbin_model_string(), store).await?);
        let manager = PermissionManager::new(engine.clone(), menu.clone(), &config.super_user);
        let cache = UserMenuCache::new(config.menu_refresh);
        tracing::info!(
            menu_nodes = menu.node_count(),
            super_user_enabled = !config.super_user.is_empty(),
            refresh_secs = config.menu_refresh.as_secs(),
            "authorization context ready"
        );
        Ok(Self {
            config,
            menu,
            engine,
            manager,
            cache,
        })
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<PolicyEngine> {
        &self.engine
    }

    pub fn manager(&self) -> &PermissionManager {
        &self.manager
    }

    pub fn menu_store(&self) -> &Arc<MenuStore> {
        &self.menu
    }

    pub async fn check_permission(
        &self,
        user: &str,
        menu_key: &str,
        action: &str,
    ) -> AuthzResult<PermissionCheck> {
        let Ok(action) = action.parse::<Action>() else {
            return Ok(PermissionCheck {
                allowed: false,
                exists: false,
            });
        };
        let allowed = self.manager.has_permission(user, menu_key, action).await?;
        Ok(PermissionCheck {
            allowed,
            exists: true,
        })
    }

    /// The full, unfiltered menu tree.
    pub fn menu(&self) -> Arc<Vec<MenuNode>> {
        self.menu.tree()
    }

    pub async fn user_menu(&self, user: &str) -> AuthzResult<Vec<MenuNode>> {
        self.cache.get_menu(user, &self.manager, &self.menu).await
    }

    /// Reload `definition`, or the embedded menu when `None`.
    pub fn reload_menu(&self, definition: Option<&[u8]>) -> AuthzResult<()> {
        match definition {
            Some(bytes) => self.menu.reload(bytes)?,
            None => self.menu.reload_embedded()?,
        }
        self.cache.invalidate();
        Ok(())
    }

    pub async fn grant_permission(
        &self,
        role: &str,
        object: &str,
        actions: &[Action],
    ) -> AuthzResult<bool> {
        let result = self.manager.grant_permission(role, object, actions).await;
        self.cache.invalidate();
        result
    }

    pub async fn revoke_permission(
        &self,
        role: &str,
        object: &str,
        actions: &[Action],
    ) -> AuthzResult<bool> {
        let result = self.manager.revoke_permission(role, object, actions).await;
        self.cache.invalidate();
        result
    }

    pub async fn assign_role(&self, user: &str, role: &str) -> AuthzResult<bool> {
        let result = self.manager.assign_role(user, role).await;
        self.cache.invalidate();
        result
    }

    pub async fn unassign_role(&self, user: &str, role: &str) -> AuthzResult<bool> {
        let result = self.manager.unassign_role(user, role).await;
        self.cache.invalidate();
        result
    }

    pub async fn reconcile_user_roles(&self, user: &str, roles: &[String]) -> AuthzResult<bool> {
        let result = self.manager.reconcile_user_roles(user, roles).await;
        self.cache.invalidate();
        result
    }

    pub async fn delete_role(&self, role: &str) -> AuthzResult<bool> {
        let result = self.manager.delete_role(role).await;
        self.cache.invalidate();
        result
    }

    pub async fn roles_for_user(&self, user: &str) -> AuthzResult<Vec<String>> {
        self.manager.roles_for_user(user).await
    }

    pub async fn list_roles(&self) -> AuthzResult<Vec<String>> {
        self.manager.all_roles().await
    }

    pub async fn role_permissions(&self, roles: &[String]) -> AuthzResult<Vec<RolePermissions>> {
        self.manager.role_permissions(roles).await
    }

    pub async fn operations_held(&self, user: &str, object: &str) -> AuthzResult<Vec<Action>> {
        self.manager.list_operations_held(user, object).await
    }
}
