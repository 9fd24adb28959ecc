//! Permission service
//!
//! Effective permission sets, cache-aside under `auth:perm:{user_id}` with
//! the session lifetime as TTL.

use kernel::id::UserId;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::permission::{PermissionSet, merge_permissions};
use crate::domain::repository::AuthStore;
use crate::error::AuthResult;
use crate::infra::cache::{CacheStore, keys};

pub struct PermissionService<S: AuthStore> {
    store: Arc<S>,
    cache: Option<Arc<CacheStore>>,
    ttl: Duration,
}

impl<S: AuthStore> PermissionService<S> {
    pub fn new(store: Arc<S>, cache: Option<Arc<CacheStore>>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn effective_permissions(&self, user_id: UserId) -> AuthResult<PermissionSet> {
        let key = keys::permissions(user_id);

        if let Some(cache) = &self.cache {
            match cache.get_json::<Vec<String>>(&key).await {
                Ok(Some(slugs)) => return Ok(slugs.into_iter().collect()),
                Ok(None) => {}
                Err(e) => tracing::warn!(user_id = %user_id, error = %e, "Permission cache read failed"),
            }
        }

        let set = self.compute(user_id).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_json(&key, &sorted(&set), self.ttl).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to cache permissions");
            }
        }

        Ok(set)
    }

    pub async fn has_permission(&self, user_id: UserId, slug: &str) -> AuthResult<bool> {
        Ok(self.effective_permissions(user_id).await?.contains(slug))
    }

    /// Drop the user's cached set. Called on login, refresh and whenever the
    /// user's roles or overrides change.
    pub async fn invalidate_user(&self, user_id: UserId) -> AuthResult<()> {
        if let Some(cache) = &self.cache {
            cache.delete(&[keys::permissions(user_id)]).await?;
        }
        Ok(())
    }

    /// Drop every cached set. Called on any role, menu or permission catalog
    /// change.
    pub async fn invalidate_all(&self) -> AuthResult<u64> {
        let Some(cache) = &self.cache else {
            return Ok(0);
        };
        let removed = cache.delete_pattern(keys::ALL_PERMISSIONS).await?;
        tracing::info!(removed, "Invalidated all cached permission sets");
        Ok(removed)
    }

    /// Invalidate then recompute. A failed invalidation is logged and the
    /// set is recomputed from the store regardless.
    pub async fn refresh_user(&self, user_id: UserId) -> AuthResult<PermissionSet> {
        if let Err(e) = self.invalidate_user(user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to invalidate permission cache");
            // a stale cached set would be served; go straight to the store
            return self.compute(user_id).await;
        }
        self.effective_permissions(user_id).await
    }

    async fn compute(&self, user_id: UserId) -> AuthResult<PermissionSet> {
        let role_ids = self.store.role_ids_for_user(user_id).await?;
        let role_slugs = self.store.permission_slugs_for_roles(&role_ids).await?;
        let overrides = self.store.permission_overrides_for_user(user_id).await?;

        Ok(merge_permissions(role_slugs, &overrides))
    }
}

/// Deterministic list form of a set
pub fn sorted(set: &PermissionSet) -> Vec<String> {
    let mut list: Vec<String> = set.iter().cloned().collect();
    list.sort();
    list
}
