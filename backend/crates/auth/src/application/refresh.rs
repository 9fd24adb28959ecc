//! Refresh Use Case
//!
//! Mints a new access token for a session whose refresh token has already
//! passed validation. The refresh token itself is returned unchanged and
//! stays usable until it expires.

use chrono::Utc;
use platform::device::DeviceContext;
use std::sync::Arc;

use crate::application::audit::AuditQueue;
use crate::application::login::{AuthOutput, resolve_access};
use crate::application::menu_service::MenuService;
use crate::application::permission_service::PermissionService;
use crate::application::token_service::{AuthenticatedToken, TokenService};
use crate::domain::entity::TokenPair;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::token_type::TokenType;
use crate::error::{AuthError, AuthResult};

/// Refresh input
pub struct RefreshInput {
    /// Output of `TokenService::authenticate_refresh`
    pub refresh: AuthenticatedToken,
    pub device: DeviceContext,
}

/// Refresh use case
pub struct RefreshUseCase<S: AuthStore> {
    store: Arc<S>,
    tokens: Arc<TokenService<S>>,
    permissions: Arc<PermissionService<S>>,
    menus: Arc<MenuService<S>>,
    audit: AuditQueue,
}

impl<S: AuthStore> RefreshUseCase<S> {
    pub fn new(
        store: Arc<S>,
        tokens: Arc<TokenService<S>>,
        permissions: Arc<PermissionService<S>>,
        menus: Arc<MenuService<S>>,
        audit: AuditQueue,
    ) -> Self {
        Self {
            store,
            tokens,
            permissions,
            menus,
            audit,
        }
    }

    pub async fn execute(&self, input: RefreshInput) -> AuthResult<AuthOutput> {
        let RefreshInput { refresh, device } = input;
        let claims = &refresh.claims;

        let user = self
            .store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or(AuthError::unauthorized("user not found"))?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let mut session = self.tokens.validate_session(claims).await?;

        let access = self
            .tokens
            .issue(&user, session.id, &device, TokenType::Access, true)?;
        self.tokens.persist(&access).await?;

        let now = Utc::now();
        self.store.touch_session(session.id, now).await?;
        session.last_used_at = now;
        self.tokens.mirror_session(&session).await;

        self.audit.mark_token_used(refresh.token_hash.clone());

        let (permissions, menus) =
            resolve_access(&self.permissions, &self.menus, user.id).await?;

        tracing::info!(user_id = %user.id, session_id = %session.id, "Access token refreshed");

        Ok(AuthOutput {
            tokens: TokenPair::new(
                access.token,
                access.record.expires_at,
                refresh.token.clone(),
                claims.expires_at(),
            ),
            user,
            menus,
            permissions,
            session,
        })
    }
}
