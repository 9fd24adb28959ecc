//! Effective permission merge
//!
//! A user's effective permissions are the slugs granted through their roles,
//! plus slugs the user was granted directly, minus slugs the user was denied
//! directly. A direct denial beats any role grant.

use std::collections::{HashMap, HashSet};

/// Unordered set of permission slugs
pub type PermissionSet = HashSet<String>;

/// Merge role grants with per-user overrides (`slug -> granted`).
///
/// Overrides are keyed by slug, so each slug has exactly one final state and
/// the iteration order of the map cannot affect the result.
pub fn merge_permissions<I>(role_permissions: I, overrides: &HashMap<String, bool>) -> PermissionSet
where
    I: IntoIterator<Item = String>,
{
    let mut set: PermissionSet = role_permissions.into_iter().collect();

    for (slug, granted) in overrides {
        if *granted {
            set.insert(slug.clone());
        } else {
            set.remove(slug);
        }
    }

    set
}
