//! Menu authorization for the Backstage back office.
//!
//! # Purpose
//! Decides which menu items and which CRUD operations on them a user may use.
//! Policy lives in a casbin RBAC model whose action field is a comma-separated
//! set; the menu is a declarative tree pruned per user and cached.
//!
//! # How it fits
//! The API service builds one [`AuthzContext`] at startup and shares it with
//! every handler. The context owns the menu store, the casbin-backed policy
//! engine, the role/permission manager, and the user menu cache.
//!
//! # Key invariants
//! - A policy grants `subject` every action listed in its action field; a
//!   requested action matches only an exact token of that field.
//! - Role inheritance is transitive through grouping rows.
//! - The configured super-user passes every check; an empty name disables it.
//! - The policy store is authoritative; the enforcer is reloaded from it
//!   after every mutation.
//!
//! # Examples
//! ```rust
//! use backstage_authz::{action_set_match, normalize_action_order};
//!
//! assert!(action_set_match("update", "read,update"));
//! assert!(!action_set_match("rea", "read"));
//! assert_eq!(normalize_action_order(&["update", "read", "read"]), "read,update");
//! ```
//!
//! # Common pitfalls
//! - Writing policy rows with an unnormalized action field makes revoke miss
//!   them; go through [`PermissionManager`] or [`normalize_action_order`].
//! - Cached user menus only notice direct store writes after the refresh
//!   interval; mutate through [`AuthzContext`] to invalidate immediately.

mod action;
mod cache;
mod casbin_model;
mod config;
mod context;
mod engine;
mod errors;
mod filter;
mod manager;
mod matcher;
mod menu;
pub mod policy_store;

pub use action::{Action, join_actions, normalize_action_order};
pub use cache::UserMenuCache;
pub use casbin_model::{casbin_model_string, load_model};
pub use config::{AuthzConfig, DEFAULT_MENU_REFRESH, DEFAULT_POLICY_TABLE};
pub use context::{AuthzContext, PermissionCheck};
pub use engine::{PolicyEngine, register_action_set_matcher};
pub use errors::{AuthzError, AuthzResult, EngineError, EngineResult};
pub use filter::filter_menu;
pub use manager::{
    PermissionManager, PermissionObj, RolePermissions, group_permissions, permission_map,
};
pub use matcher::{ACTION_MATCH_FN, action_set_match, invoke_action_matcher};
pub use menu::{MenuNode, MenuPermission, MenuStore, load_menu};
pub use policy_store::{GroupingRule, PolicyRule, PolicyStore, StoreError, StoreResult};
