//! Persistence seam for policy (`p`) and grouping (`g`) rows.
//!
//! # Purpose
//! The enforcer keeps an in-memory copy of policy; this trait is where the
//! authoritative copy lives. The engine writes here first and then reloads
//! the enforcer from [`PolicyStore::list_policies`] and
//! [`PolicyStore::list_groupings`].
//!
//! # Backends
//! - [`memory::InMemoryPolicyStore`] for tests and single-process runs.
//! - [`postgres::PostgresPolicyStore`] for a shared relational table whose
//!   name comes from configuration.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod postgres;

/// Stored permission: `subject` may perform any action listed in the
/// comma-joined `action` field on `object`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }

    pub(crate) fn into_casbin(self) -> Vec<String> {
        vec![self.subject, self.object, self.action]
    }
}

/// Role inheritance: `user` holds every permission granted to `role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupingRule {
    pub user: String,
    pub role: String,
}

impl GroupingRule {
    pub fn new(user: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            role: role.into(),
        }
    }

    pub(crate) fn into_casbin(self) -> Vec<String> {
        vec![self.user, self.role]
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid policy table name: {0}")]
    InvalidTable(String),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn list_policies(&self) -> StoreResult<Vec<PolicyRule>>;
    async fn list_groupings(&self) -> StoreResult<Vec<GroupingRule>>;

    /// Insert rules that are not stored yet. Returns true if anything was added.
    async fn add_policies(&self, rules: Vec<PolicyRule>) -> StoreResult<bool>;
    /// Remove one exact rule. Returns true if it existed.
    async fn remove_policy(&self, rule: &PolicyRule) -> StoreResult<bool>;

    async fn add_groupings(&self, groupings: Vec<GroupingRule>) -> StoreResult<bool>;
    async fn remove_grouping(&self, grouping: &GroupingRule) -> StoreResult<bool>;
    async fn remove_groupings_for_user(&self, user: &str) -> StoreResult<bool>;
    /// Drop every grouping that references `role` and every rule it is the
    /// subject of.
    async fn remove_role(&self, role: &str) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
