use serde::{Deserialize, Serialize};

/// CRUD operation a policy can grant on a menu permission key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    /// Canonical ordering used whenever actions are joined into a policy field.
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(()),
        }
    }
}

/// Join actions into the stored action-set form: canonical order, no
/// duplicates, unknown values dropped.
///
/// ```rust
/// use backstage_authz::normalize_action_order;
///
/// assert_eq!(normalize_action_order(&["delete", "create"]), "create,delete");
/// ```
pub fn normalize_action_order<S: AsRef<str>>(actions: &[S]) -> String {
    let present: Vec<Action> = actions
        .iter()
        .filter_map(|action| action.as_ref().parse().ok())
        .collect();
    Action::ALL
        .iter()
        .filter(|action| present.contains(action))
        .map(|action| action.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Same as [`normalize_action_order`] for already-typed actions.
pub fn join_actions(actions: &[Action]) -> String {
    let names: Vec<&str> = actions.iter().map(|action| action.as_str()).collect();
    normalize_action_order(&names)
}
