//! Logout Use Case
//!
//! Revokes one session, or every session of a user. Identity comes from an
//! access token the calling layer has already validated.

use kernel::id::{SessionId, UserId};
use std::sync::Arc;

use crate::application::token_service::{RevokeAllOutcome, TokenService};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::token_hash::TokenHash;
use crate::error::AuthResult;

/// Logout use case
pub struct LogoutUseCase<S: AuthStore> {
    tokens: Arc<TokenService<S>>,
}

impl<S: AuthStore> LogoutUseCase<S> {
    pub fn new(tokens: Arc<TokenService<S>>) -> Self {
        Self { tokens }
    }

    /// Sign out from the session the access token belongs to
    pub async fn execute(
        &self,
        access_token_hash: &TokenHash,
        user_id: UserId,
        session_id: SessionId,
    ) -> AuthResult<()> {
        self.tokens
            .revoke(access_token_hash, user_id, session_id)
            .await
    }

    /// Sign out from all sessions, the current one included
    pub async fn execute_all(&self, user_id: UserId) -> AuthResult<RevokeAllOutcome> {
        self.tokens.revoke_all(user_id).await
    }
}
