//! Menu definition and the shared, reloadable menu tree.
//!
//! # Purpose
//! Parses the declarative menu document into [`MenuNode`]s and keeps the
//! current tree behind a read-mostly lock so filters and handlers can take
//! cheap snapshots while an operator reloads the definition.
//!
//! # Key invariants
//! - A node with children is a grouping node and carries no enforceable
//!   permission; a node without children is a leaf.
//! - The permission key of a leaf is its ancestors' names and its own name
//!   joined with `/`.
//! - Reload replaces the whole tree. A definition that fails to parse leaves
//!   the previous tree in place.
use crate::AuthzResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const EMBEDDED_MENU: &[u8] = include_bytes!("menu.json");

/// Display metadata for one action declared on a menu node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuPermission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub enable: bool,
}

/// One menu entry. Only `name` is required; it is the permission key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub permissions: BTreeMap<String, MenuPermission>,
    #[serde(default)]
    pub children: Vec<MenuNode>,
}

impl MenuNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parse a menu definition (a JSON array of nodes).
pub fn load_menu(definition: &[u8]) -> AuthzResult<Vec<MenuNode>> {
    Ok(serde_json::from_slice(definition)?)
}

/// Shared holder for the current menu tree.
#[derive(Debug)]
pub struct MenuStore {
    tree: RwLock<Arc<Vec<MenuNode>>>,
}

impl MenuStore {
    pub fn new(nodes: Vec<MenuNode>) -> Self {
        Self {
            tree: RwLock::new(Arc::new(nodes)),
        }
    }

    pub fn from_json(definition: &[u8]) -> AuthzResult<Self> {
        Ok(Self::new(load_menu(definition)?))
    }

    /// Load the menu definition compiled into the crate.
    pub fn embedded() -> AuthzResult<Self> {
        Self::from_json(EMBEDDED_MENU)
    }

    /// Current tree. Cheap to call; the snapshot stays valid across reloads.
    pub fn tree(&self) -> Arc<Vec<MenuNode>> {
        self.tree.read().clone()
    }

    /// Parse `definition` and swap it in as the new tree.
    pub fn reload(&self, definition: &[u8]) -> AuthzResult<()> {
        let nodes = load_menu(definition)?;
        let count = count_nodes(&nodes);
        *self.tree.write() = Arc::new(nodes);
        tracing::info!(nodes = count, "menu definition reloaded");
        Ok(())
    }

    pub fn reload_embedded(&self) -> AuthzResult<()> {
        self.reload(EMBEDDED_MENU)
    }

    pub fn node_count(&self) -> usize {
        count_nodes(&self.tree())
    }

    /// Map every leaf's permission key to its display title, both built by
    /// joining ancestor values with `/`.
    pub fn title_index(&self) -> HashMap<String, String> {
        let tree = self.tree();
        let mut index = HashMap::new();
        collect_titles(&tree, "", "", &mut index);
        index
    }
}

fn collect_titles(
    nodes: &[MenuNode],
    name_prefix: &str,
    title_prefix: &str,
    index: &mut HashMap<String, String>,
) {
    for node in nodes {
        let name = format!("{name_prefix}{}", node.name);
        let title = format!("{title_prefix}{}", node.title);
        if node.is_leaf() {
            index.insert(name, title);
        } else {
            collect_titles(
                &node.children,
                &format!("{name}/"),
                &format!("{title}/"),
                index,
            );
        }
    }
}

fn count_nodes(nodes: &[MenuNode]) -> usize {
    nodes
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LEVEL: &str = r#"[
        {"id": 1, "title": "Dashboard", "name": "dashboard", "enable": true,
         "permissions": {"read": {"title": "View", "enable": true}}},
        {"id": 2, "title": "Finance", "name": "finance", "enable": true, "permissions": {},
         "children": [
            {"id": 3, "title": "Invoices", "name": "invoice", "enable": true,
             "permissions": {"read": {"title": "View", "enable": true},
                             "update": {"title": "Edit", "enable": false}}},
            {"id": 4, "title": "Ledger", "name": "ledger", "enable": true}
         ]}
    ]"#;

    #[test]
    fn load_parses_nested_definition() {
        let nodes = load_menu(TWO_LEVEL.as_bytes()).expect("menu");
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_leaf());
        assert_eq!(nodes[1].children.len(), 2);
        let invoice = &nodes[1].children[0];
        assert_eq!(invoice.name, "invoice");
        assert!(!invoice.permissions["update"].enable);
        assert!(nodes[1].children[1].permissions.is_empty());
    }

    #[test]
    fn load_rejects_malformed_definition() {
        assert!(load_menu(b"{\"id\": 1}").is_err());
        assert!(load_menu(b"[{\"id\": \"one\"}]").is_err());
        assert!(load_menu(b"not json").is_err());
    }

    #[test]
    fn load_defaults_omitted_fields() {
        let nodes = load_menu(br#"[{"name": "reports", "permissions": {"read": {}}}]"#)
            .expect("sparse menu");
        assert_eq!(nodes[0].id, 0);
        assert_eq!(nodes[0].title, "");
        assert!(!nodes[0].enable);
        assert!(nodes[0].is_leaf());
        assert_eq!(nodes[0].permissions["read"].title, "");

        assert!(load_menu(br#"[{"id": 1, "title": "Reports"}]"#).is_err());
    }

    #[test]
    fn title_index_composes_parent_paths() {
        let store = MenuStore::from_json(TWO_LEVEL.as_bytes()).expect("store");
        let index = store.title_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index["dashboard"], "Dashboard");
        assert_eq!(index["finance/invoice"], "Finance/Invoices");
        assert_eq!(index["finance/ledger"], "Finance/Ledger");
        assert!(!index.contains_key("finance"));
    }

    #[test]
    fn title_index_handles_deeper_trees() {
        let store = MenuStore::from_json(
            br#"[{"id": 1, "title": "Ops", "name": "ops", "enable": true, "children": [
                {"id": 2, "title": "Users", "name": "users", "enable": true, "children": [
                    {"id": 3, "title": "Audit", "name": "audit", "enable": true}
                ]}
            ]}]"#,
        )
        .expect("store");
        let index = store.title_index();
        assert_eq!(index["ops/users/audit"], "Ops/Users/Audit");
    }

    #[test]
    fn reload_replaces_tree_and_keeps_old_snapshot() {
        let store = MenuStore::from_json(TWO_LEVEL.as_bytes()).expect("store");
        let before = store.tree();
        assert_eq!(store.node_count(), 4);

        store
            .reload(br#"[{"id": 9, "title": "Reports", "name": "reports", "enable": true}]"#)
            .expect("reload");
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.tree()[0].name, "reports");
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn failed_reload_keeps_previous_tree() {
        let store = MenuStore::from_json(TWO_LEVEL.as_bytes()).expect("store");
        assert!(store.reload(b"[").is_err());
        assert_eq!(store.node_count(), 4);
    }

    #[test]
    fn embedded_menu_parses() {
        let store = MenuStore::embedded().expect("embedded menu");
        assert!(store.node_count() > 0);
        assert!(store.title_index().values().all(|title| !title.is_empty()));
    }
}
