//! Auth orchestrator
//!
//! Wires the services once and exposes the five account operations. The
//! narrower request-authentication surface (`authenticate`,
//! `authenticate_refresh`, `has_permission`) is what the middleware uses.

use kernel::id::{SessionId, UserId};
use std::sync::Arc;

use crate::application::audit::AuditQueue;
use crate::application::config::AuthConfig;
use crate::application::login::{AuthOutput, LoginInput, LoginUseCase};
use crate::application::logout::LogoutUseCase;
use crate::application::menu_service::MenuService;
use crate::application::permission_service::PermissionService;
use crate::application::refresh::{RefreshInput, RefreshUseCase};
use crate::application::register::{RegisterInput, RegisterUseCase};
use crate::application::token_codec::TokenCodec;
use crate::application::token_service::{AuthenticatedToken, RevokeAllOutcome, TokenService};
use crate::domain::entity::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::token_hash::TokenHash;
use crate::error::AuthResult;
use crate::infra::cache::CacheStore;

pub struct AuthOrchestrator<S: AuthStore> {
    register: RegisterUseCase<S>,
    login: LoginUseCase<S>,
    refresh: RefreshUseCase<S>,
    logout: LogoutUseCase<S>,
    tokens: Arc<TokenService<S>>,
    permissions: Arc<PermissionService<S>>,
    menus: Arc<MenuService<S>>,
}

impl<S: AuthStore> AuthOrchestrator<S> {
    /// `cache = None` runs the engine on the durable store alone.
    pub fn new(
        store: Arc<S>,
        cache: Option<Arc<CacheStore>>,
        config: Arc<AuthConfig>,
        audit: AuditQueue,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config));
        let tokens = Arc::new(TokenService::new(
            store.clone(),
            cache.clone(),
            codec,
            audit.clone(),
        ));
        let permissions = Arc::new(PermissionService::new(
            store.clone(),
            cache,
            config.refresh_token_ttl,
        ));
        let menus = Arc::new(MenuService::new(store.clone()));

        Self {
            register: RegisterUseCase::new(store.clone(), config.clone()),
            login: LoginUseCase::new(
                store.clone(),
                config,
                tokens.clone(),
                permissions.clone(),
                menus.clone(),
            ),
            refresh: RefreshUseCase::new(
                store,
                tokens.clone(),
                permissions.clone(),
                menus.clone(),
                audit,
            ),
            logout: LogoutUseCase::new(tokens.clone()),
            tokens,
            permissions,
            menus,
        }
    }

    // ------------------------------------------------------------------------
    // Account operations
    // ------------------------------------------------------------------------

    pub async fn register(&self, input: RegisterInput) -> AuthResult<User> {
        self.register.execute(input).await
    }

    pub async fn login(&self, input: LoginInput) -> AuthResult<AuthOutput> {
        self.login.execute(input).await
    }

    pub async fn refresh_token(&self, input: RefreshInput) -> AuthResult<AuthOutput> {
        self.refresh.execute(input).await
    }

    pub async fn logout(
        &self,
        access_token_hash: &TokenHash,
        user_id: UserId,
        session_id: SessionId,
    ) -> AuthResult<()> {
        self.logout
            .execute(access_token_hash, user_id, session_id)
            .await
    }

    pub async fn logout_all(&self, user_id: UserId) -> AuthResult<RevokeAllOutcome> {
        self.logout.execute_all(user_id).await
    }

    // ------------------------------------------------------------------------
    // Request authentication
    // ------------------------------------------------------------------------

    pub async fn authenticate(&self, bearer_header: &str) -> AuthResult<AuthenticatedToken> {
        self.tokens.authenticate(bearer_header).await
    }

    pub async fn authenticate_refresh(&self, bearer_header: &str) -> AuthResult<AuthenticatedToken> {
        self.tokens.authenticate_refresh(bearer_header).await
    }

    pub async fn has_permission(&self, user_id: UserId, slug: &str) -> AuthResult<bool> {
        self.permissions.has_permission(user_id, slug).await
    }

    // ------------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------------

    pub fn tokens(&self) -> &TokenService<S> {
        &self.tokens
    }

    pub fn permissions(&self) -> &PermissionService<S> {
        &self.permissions
    }

    pub fn menus(&self) -> &MenuService<S> {
        &self.menus
    }
}
