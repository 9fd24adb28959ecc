//! Menu Entity
//!
//! A node of the navigation tree. `permissions` lists the slugs that grant
//! visibility ("any of"); a node with none is structural and is only shown
//! when something beneath it is.

use kernel::id::MenuId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: MenuId,
    pub parent_id: Option<MenuId>,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub route: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub permissions: Vec<String>,
    pub children: Vec<Menu>,
}

impl Menu {
    pub fn is_structural(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Copy of the node with an empty `children` list.
    pub fn without_children(&self) -> Menu {
        Menu {
            id: self.id,
            parent_id: self.parent_id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            icon: self.icon.clone(),
            route: self.route.clone(),
            display_order: self.display_order,
            is_active: self.is_active,
            permissions: self.permissions.clone(),
            children: Vec::new(),
        }
    }
}

/// Stable in-place sort by display order.
pub fn sort_by_display_order(menus: &mut [Menu]) {
    menus.sort_by_key(|m| m.display_order);
}
