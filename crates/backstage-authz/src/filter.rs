use crate::manager::PermissionManager;
use crate::menu::MenuNode;
use crate::{Action, AuthzResult};
use futures::future::BoxFuture;

/// Prune `nodes` to what `user` may read.
///
/// Leaves are checked against `prefix + name` with [`Action::Read`]; grouping
/// nodes survive only when at least one descendant does. The input is left
/// untouched and the first failed check aborts the whole walk.
pub fn filter_menu<'a>(
    manager: &'a PermissionManager,
    nodes: &'a [MenuNode],
    prefix: &'a str,
    user: &'a str,
) -> BoxFuture<'a, AuthzResult<Vec<MenuNode>>> {
    Box::pin(async move {
        let mut kept = Vec::new();
        for node in nodes {
            if node.is_leaf() {
                if leaf_visible(manager, node, prefix, user).await? {
                    kept.push(MenuNode {
                        children: Vec::new(),
                        ..node.clone()
                    });
                }
                continue;
            }

            let child_prefix = format!("{prefix}{}/", node.name);
            let children = filter_menu(manager, &node.children, &child_prefix, user).await?;
            if !children.is_empty() {
                kept.push(MenuNode {
                    id: node.id,
                    title: node.title.clone(),
                    name: node.name.clone(),
                    enable: node.enable,
                    permissions: node.permissions.clone(),
                    children,
                });
            }
        }
        Ok(kept)
    })
}

async fn leaf_visible(
    manager: &PermissionManager,
    node: &MenuNode,
    prefix: &str,
    user: &str,
) -> AuthzResult<bool> {
    if manager.is_super_user(user) {
        return Ok(true);
    }
    let key = format!("{prefix}{}", node.name);
    manager.has_permission(user, &key, Action::Read).await
}
