use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_POLICY_TABLE: &str = "casbin_rule";
pub const DEFAULT_MENU_REFRESH: Duration = Duration::from_secs(300);

/// Settings for one [`crate::AuthzContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Table holding `p`/`g` rows when the Postgres store is used.
    pub policy_table: String,
    /// Subject that passes every check. Empty disables the bypass.
    pub super_user: String,
    /// Shared lifetime of cached user menus.
    pub menu_refresh: Duration,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            policy_table: DEFAULT_POLICY_TABLE.to_string(),
            super_user: String::new(),
            menu_refresh: DEFAULT_MENU_REFRESH,
        }
    }
}
