//! In-memory repository
//!
//! Same contract as the PostgreSQL store, held in process. Used for local
//! development without a database and by the engine's tests. The catalog
//! (roles, grants, overrides, menus) is seeded through the inherent methods.

use chrono::{DateTime, Utc};
use kernel::id::{MenuId, RoleId, SessionId, UserId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::entity::{Menu, User, UserSession, UserToken, menu::sort_by_display_order};
use crate::domain::repository::{
    MenuRepository, PermissionRepository, SessionRepository, TokenRepository, UserRepository,
};
use crate::domain::value_object::{email::Email, token_hash::TokenHash};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    sessions: HashMap<SessionId, UserSession>,
    tokens: HashMap<TokenHash, UserToken>,
    role_permissions: HashMap<RoleId, HashSet<String>>,
    user_roles: HashMap<UserId, Vec<RoleId>>,
    overrides: HashMap<UserId, HashMap<String, bool>>,
    menus: HashMap<MenuId, Menu>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAuthRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a role and the permission slugs it grants.
    pub fn add_role<I, S>(&self, role_id: RoleId, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .write()
            .role_permissions
            .insert(role_id, permissions.into_iter().map(Into::into).collect());
    }

    pub fn assign_role(&self, user_id: UserId, role_id: RoleId) {
        let mut state = self.state.write();
        let roles = state.user_roles.entry(user_id).or_default();
        if !roles.contains(&role_id) {
            roles.push(role_id);
        }
    }

    /// Grant (`true`) or revoke (`false`) a slug for one user.
    pub fn set_permission_override(&self, user_id: UserId, slug: impl Into<String>, granted: bool) {
        self.state
            .write()
            .overrides
            .entry(user_id)
            .or_default()
            .insert(slug.into(), granted);
    }

    /// Insert a menu node. Its `children` are ignored; the tree is rebuilt from
    /// `parent_id` links.
    pub fn add_menu(&self, mut menu: Menu) {
        menu.children.clear();
        self.state.write().menus.insert(menu.id, menu);
    }

    fn active_menus_where(&self, parent: Option<MenuId>) -> Vec<Menu> {
        let state = self.state.read();
        let mut menus: Vec<Menu> = state
            .menus
            .values()
            .filter(|m| m.is_active && m.parent_id == parent)
            .cloned()
            .collect();
        sort_by_display_order(&mut menus);
        menus
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for MemoryAuthRepository {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        Ok(self.state.read().users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .state
            .read()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &Email) -> AuthResult<bool> {
        Ok(self.state.read().users.values().any(|u| &u.email == email))
    }

    async fn increment_failed_logins(&self, user_id: UserId) -> AuthResult<i32> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        user.failed_login_attempts += 1;
        user.updated_at = Utc::now();
        Ok(user.failed_login_attempts)
    }

    async fn lock_user(&self, user_id: UserId, until: DateTime<Utc>) -> AuthResult<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.locked_until = Some(until);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset_login_lock(&self, user_id: UserId) -> AuthResult<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.clear_lock();
        }
        Ok(())
    }

    async fn record_successful_login(&self, user_id: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        if let Some(user) = self.state.write().users.get_mut(&user_id) {
            user.record_login(at);
        }
        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for MemoryAuthRepository {
    async fn create_session(&self, session: &UserSession) -> AuthResult<()> {
        self.state
            .write()
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: SessionId) -> AuthResult<Option<UserSession>> {
        Ok(self.state.read().sessions.get(&session_id).cloned())
    }

    async fn touch_session(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()> {
        if let Some(session) = self.state.write().sessions.get_mut(&session_id) {
            session.last_used_at = at;
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: SessionId) -> AuthResult<()> {
        self.state.write().sessions.remove(&session_id);
        Ok(())
    }

    async fn deactivate_user_sessions(&self, user_id: UserId) -> AuthResult<u64> {
        let mut state = self.state.write();
        let mut updated = 0;
        for session in state
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            updated += 1;
        }
        Ok(updated)
    }
}

// ============================================================================
// Token Repository Implementation
// ============================================================================

impl TokenRepository for MemoryAuthRepository {
    async fn create_token(&self, token: &UserToken) -> AuthResult<()> {
        self.state
            .write()
            .tokens
            .insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_token_by_hash(&self, token_hash: &TokenHash) -> AuthResult<Option<UserToken>> {
        Ok(self.state.read().tokens.get(token_hash).cloned())
    }

    async fn find_live_tokens_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AuthResult<Vec<UserToken>> {
        Ok(self
            .state
            .read()
            .tokens
            .values()
            .filter(|t| t.user_id == user_id && !t.is_expired(now))
            .cloned()
            .collect())
    }

    async fn delete_tokens(&self, token_hashes: &[TokenHash]) -> AuthResult<u64> {
        let mut state = self.state.write();
        let deleted = token_hashes
            .iter()
            .filter(|h| state.tokens.remove(*h).is_some())
            .count();
        Ok(deleted as u64)
    }

    async fn delete_user_tokens(&self, user_id: UserId) -> AuthResult<u64> {
        let mut state = self.state.write();
        let before = state.tokens.len();
        state.tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - state.tokens.len()) as u64)
    }

    async fn mark_token_used(&self, token_hash: &TokenHash, at: DateTime<Utc>) -> AuthResult<()> {
        if let Some(token) = self.state.write().tokens.get_mut(token_hash) {
            token.used_at = Some(at);
        }
        Ok(())
    }
}

// ============================================================================
// Permission Repository Implementation
// ============================================================================

impl PermissionRepository for MemoryAuthRepository {
    async fn role_ids_for_user(&self, user_id: UserId) -> AuthResult<Vec<RoleId>> {
        Ok(self
            .state
            .read()
            .user_roles
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn permission_slugs_for_roles(&self, role_ids: &[RoleId]) -> AuthResult<Vec<String>> {
        let state = self.state.read();
        let slugs: HashSet<String> = role_ids
            .iter()
            .filter_map(|id| state.role_permissions.get(id))
            .flatten()
            .cloned()
            .collect();
        Ok(slugs.into_iter().collect())
    }

    async fn permission_overrides_for_user(
        &self,
        user_id: UserId,
    ) -> AuthResult<HashMap<String, bool>> {
        Ok(self
            .state
            .read()
            .overrides
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Menu Repository Implementation
// ============================================================================

impl MenuRepository for MemoryAuthRepository {
    async fn find_root_menus(&self) -> AuthResult<Vec<Menu>> {
        Ok(self.active_menus_where(None))
    }

    async fn find_child_menus(&self, parent_id: MenuId) -> AuthResult<Vec<Menu>> {
        Ok(self.active_menus_where(Some(parent_id)))
    }
}
