//! Repository Traits
//!
//! Interfaces for the durable store. The store is authoritative: the cache
//! only ever mirrors what is written here. Every method is independently
//! atomic; nothing holds a transaction open across calls.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use kernel::id::{MenuId, RoleId, SessionId, UserId};

use crate::domain::entity::{Menu, User, UserSession, UserToken};
use crate::domain::value_object::{email::Email, token_hash::TokenHash};
use crate::error::AuthResult;

/// Users and login-state bookkeeping
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    async fn create_user(&self, user: &User) -> AuthResult<()>;

    async fn find_user_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn email_exists(&self, email: &Email) -> AuthResult<bool>;

    /// Atomically increment the failed-login counter and return the new value.
    async fn increment_failed_logins(&self, user_id: UserId) -> AuthResult<i32>;

    async fn lock_user(&self, user_id: UserId, until: DateTime<Utc>) -> AuthResult<()>;

    /// Clear `locked_until` and reset the failed-login counter to 0.
    async fn reset_login_lock(&self, user_id: UserId) -> AuthResult<()>;

    /// Reset lock state and stamp `last_login_at`.
    async fn record_successful_login(&self, user_id: UserId, at: DateTime<Utc>) -> AuthResult<()>;
}

/// Per-device sessions
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn create_session(&self, session: &UserSession) -> AuthResult<()>;

    async fn find_session(&self, session_id: SessionId) -> AuthResult<Option<UserSession>>;

    async fn touch_session(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()>;

    async fn delete_session(&self, session_id: SessionId) -> AuthResult<()>;

    /// Mark every session of the user inactive. Rows are kept.
    async fn deactivate_user_sessions(&self, user_id: UserId) -> AuthResult<u64>;
}

/// Issued tokens, keyed by hash
#[trait_variant::make(TokenRepository: Send)]
pub trait LocalTokenRepository {
    async fn create_token(&self, token: &UserToken) -> AuthResult<()>;

    async fn find_token_by_hash(&self, token_hash: &TokenHash) -> AuthResult<Option<UserToken>>;

    /// Every token of the user that has not expired at `now`.
    async fn find_live_tokens_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AuthResult<Vec<UserToken>>;

    async fn delete_tokens(&self, token_hashes: &[TokenHash]) -> AuthResult<u64>;

    async fn delete_user_tokens(&self, user_id: UserId) -> AuthResult<u64>;

    async fn mark_token_used(&self, token_hash: &TokenHash, at: DateTime<Utc>) -> AuthResult<()>;
}

/// Role / permission catalog
#[trait_variant::make(PermissionRepository: Send)]
pub trait LocalPermissionRepository {
    async fn role_ids_for_user(&self, user_id: UserId) -> AuthResult<Vec<RoleId>>;

    /// Union of permission slugs granted to any of the roles.
    async fn permission_slugs_for_roles(&self, role_ids: &[RoleId]) -> AuthResult<Vec<String>>;

    /// Per-user overrides: `slug -> granted`.
    async fn permission_overrides_for_user(
        &self,
        user_id: UserId,
    ) -> AuthResult<HashMap<String, bool>>;
}

/// Menu tree, fetched one level at a time
#[trait_variant::make(MenuRepository: Send)]
pub trait LocalMenuRepository {
    /// Active root menus with their permission slugs; `children` is empty.
    async fn find_root_menus(&self) -> AuthResult<Vec<Menu>>;

    /// Active direct children of `parent_id`; `children` is empty.
    async fn find_child_menus(&self, parent_id: MenuId) -> AuthResult<Vec<Menu>>;
}

/// Everything the engine needs from the durable store.
pub trait AuthStore:
    UserRepository
    + SessionRepository
    + TokenRepository
    + PermissionRepository
    + MenuRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + SessionRepository
        + TokenRepository
        + PermissionRepository
        + MenuRepository
        + Send
        + Sync
        + 'static
{
}
