//! Login Use Case
//!
//! Verifies credentials, opens a session for the device and returns a token
//! pair together with the user's permissions and visible menu.

use chrono::Utc;
use kernel::id::{SessionId, UserId};
use platform::device::DeviceContext;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::menu_service::MenuService;
use crate::application::permission_service::{PermissionService, sorted};
use crate::application::token_service::TokenService;
use crate::application::user_validator::UserValidator;
use crate::domain::entity::{Menu, TokenPair, User, UserSession};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::token_type::TokenType;
use crate::error::AuthResult;

/// Login input
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub device: DeviceContext,
}

/// Result of a login or a refresh
#[derive(Debug, Clone)]
pub struct AuthOutput {
    pub user: User,
    /// Menu tree filtered to the user's permissions
    pub menus: Vec<Menu>,
    /// Effective permission slugs, sorted
    pub permissions: Vec<String>,
    pub tokens: TokenPair,
    pub session: UserSession,
}

/// Login use case
pub struct LoginUseCase<S: AuthStore> {
    store: Arc<S>,
    validator: UserValidator<S>,
    tokens: Arc<TokenService<S>>,
    permissions: Arc<PermissionService<S>>,
    menus: Arc<MenuService<S>>,
}

impl<S: AuthStore> LoginUseCase<S> {
    pub fn new(
        store: Arc<S>,
        config: Arc<AuthConfig>,
        tokens: Arc<TokenService<S>>,
        permissions: Arc<PermissionService<S>>,
        menus: Arc<MenuService<S>>,
    ) -> Self {
        Self {
            validator: UserValidator::new(store.clone(), config),
            store,
            tokens,
            permissions,
            menus,
        }
    }

    pub async fn execute(&self, input: LoginInput) -> AuthResult<AuthOutput> {
        let mut user = self
            .validator
            .validate_for_login(&input.email, input.password)
            .await?;

        let now = Utc::now();
        self.store.record_successful_login(user.id, now).await?;
        user.record_login(now);

        let session_id = SessionId::new();
        let refresh = self
            .tokens
            .issue(&user, session_id, &input.device, TokenType::Refresh, false)?;
        let access = self
            .tokens
            .issue(&user, session_id, &input.device, TokenType::Access, false)?;

        let session = UserSession::new(
            session_id,
            user.id,
            refresh.record.token_hash.clone(),
            &input.device,
            refresh.record.expires_at,
        );

        self.store.create_session(&session).await?;
        self.tokens.persist(&refresh).await?;
        self.tokens.persist(&access).await?;
        self.tokens.mirror_session(&session).await;

        let (permissions, menus) =
            resolve_access(&self.permissions, &self.menus, user.id).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            device_type = %session.device_type,
            "User logged in"
        );

        Ok(AuthOutput {
            tokens: TokenPair::new(
                access.token,
                access.record.expires_at,
                refresh.token,
                refresh.record.expires_at,
            ),
            user,
            menus,
            permissions,
            session,
        })
    }
}

/// Recompute the user's permission set (dropping the cached one first) and
/// the menu tree it unlocks.
pub(crate) async fn resolve_access<S: AuthStore>(
    permissions: &PermissionService<S>,
    menus: &MenuService<S>,
    user_id: UserId,
) -> AuthResult<(Vec<String>, Vec<Menu>)> {
    let effective = permissions.refresh_user(user_id).await?;
    let tree = menus.user_menu(&effective).await?;
    Ok((sorted(&effective), tree))
}
