//! Menu service
//!
//! Builds the navigation tree one level at a time and prunes it to what a
//! permission set can see.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::domain::entity::{Menu, menu::sort_by_display_order};
use crate::domain::permission::PermissionSet;
use crate::domain::repository::AuthStore;
use crate::error::AuthResult;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct MenuService<S: AuthStore> {
    store: Arc<S>,
}

impl<S: AuthStore> MenuService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Sort the roots by display order and attach each node's children,
    /// fetched and sorted per level, all the way down.
    pub async fn build_tree(&self, mut roots: Vec<Menu>) -> AuthResult<Vec<Menu>> {
        sort_by_display_order(&mut roots);

        let mut tree = Vec::with_capacity(roots.len());
        for root in roots {
            tree.push(self.attach_children(root).await?);
        }
        Ok(tree)
    }

    fn attach_children(&self, mut node: Menu) -> BoxFuture<'_, AuthResult<Menu>> {
        Box::pin(async move {
            let mut children = self.store.find_child_menus(node.id).await?;
            sort_by_display_order(&mut children);

            node.children = Vec::with_capacity(children.len());
            for child in children {
                node.children.push(self.attach_children(child).await?);
            }
            Ok(node)
        })
    }

    /// Full tree from the active roots.
    pub async fn full_tree(&self) -> AuthResult<Vec<Menu>> {
        let roots = self.store.find_root_menus().await?;
        self.build_tree(roots).await
    }

    /// Tree visible to a user holding `permissions`.
    pub async fn user_menu(&self, permissions: &PermissionSet) -> AuthResult<Vec<Menu>> {
        let tree = self.full_tree().await?;
        Ok(filter_by_permissions(&tree, permissions))
    }
}

/// Prune a tree to the nodes visible with `permissions`.
///
/// Children are filtered first. A node is kept when any of its required
/// slugs is held, or when it requires none and at least one child was kept.
/// The input is left untouched.
pub fn filter_by_permissions(tree: &[Menu], permissions: &PermissionSet) -> Vec<Menu> {
    tree.iter()
        .filter_map(|node| {
            let children = filter_by_permissions(&node.children, permissions);

            let visible = if node.is_structural() {
                !children.is_empty()
            } else {
                node.permissions.iter().any(|p| permissions.contains(p))
            };

            visible.then(|| Menu {
                children,
                ..node.without_children()
            })
        })
        .collect()
}
