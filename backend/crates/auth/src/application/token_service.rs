//! Token service
//!
//! Bearer validation against the blacklist and the token records, token
//! issuance, and revocation of one session or all of a user's sessions.
//!
//! Revocation blacklists first and deletes second. A token stays rejected
//! from the moment its blacklist entry lands, whatever state the store and
//! cache mirrors are in afterwards.

use chrono::Utc;
use kernel::id::{SessionId, UserId};
use platform::device::DeviceContext;
use std::sync::Arc;
use std::time::Duration;

use crate::application::audit::AuditQueue;
use crate::application::token_codec::{TokenClaims, TokenCodec};
use crate::domain::entity::{User, UserSession, UserToken};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{token_hash::TokenHash, token_type::TokenType};
use crate::error::{AuthError, AuthResult};
use crate::infra::cache::{CacheStore, keys};

const BEARER_PREFIX: &str = "Bearer ";

/// A bearer token that passed the full validation pipeline
#[derive(Debug, Clone)]
pub struct AuthenticatedToken {
    pub claims: TokenClaims,
    pub token_hash: TokenHash,
    /// The raw token as presented
    pub token: String,
}

/// A freshly signed token and the record persisted for it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub record: UserToken,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevokeAllOutcome {
    pub tokens_revoked: u64,
    pub sessions_deactivated: u64,
}

/// Pull the token out of an `Authorization: Bearer <token>` value.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let header = header.trim();
    let prefix = header.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = header[BEARER_PREFIX.len()..].trim();
    (!token.is_empty()).then_some(token)
}

pub struct TokenService<S: AuthStore> {
    store: Arc<S>,
    cache: Option<Arc<CacheStore>>,
    codec: Arc<TokenCodec>,
    audit: AuditQueue,
}

impl<S: AuthStore> TokenService<S> {
    pub fn new(
        store: Arc<S>,
        cache: Option<Arc<CacheStore>>,
        codec: Arc<TokenCodec>,
        audit: AuditQueue,
    ) -> Self {
        Self {
            store,
            cache,
            codec,
            audit,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Validate an access bearer header. On success the token is queued to be
    /// marked used.
    pub async fn authenticate(&self, bearer_header: &str) -> AuthResult<AuthenticatedToken> {
        let authenticated = self.authenticate_as(bearer_header, TokenType::Access).await?;
        self.audit.mark_token_used(authenticated.token_hash.clone());
        Ok(authenticated)
    }

    /// Validate a refresh bearer header. Refresh tokens stay valid until they
    /// expire; presenting one does not consume it. The session it belongs to
    /// must still be active.
    pub async fn authenticate_refresh(&self, bearer_header: &str) -> AuthResult<AuthenticatedToken> {
        let authenticated = self
            .authenticate_as(bearer_header, TokenType::Refresh)
            .await?;
        self.validate_session(&authenticated.claims).await?;
        Ok(authenticated)
    }

    async fn authenticate_as(
        &self,
        bearer_header: &str,
        expected: TokenType,
    ) -> AuthResult<AuthenticatedToken> {
        let token =
            extract_bearer(bearer_header).ok_or(AuthError::unauthorized("missing bearer token"))?;

        let claims = self.codec.validate(token, expected)?;
        let token_hash = TokenHash::of(token);

        if self.is_blacklisted(&token_hash).await {
            return Err(AuthError::unauthorized("token revoked"));
        }

        let record = self
            .find_token(claims.sub, &token_hash)
            .await?
            .ok_or(AuthError::unauthorized("token not found"))?;

        let now = Utc::now();
        if record.is_expired(now) {
            return Err(AuthError::unauthorized("token expired"));
        }
        if record.user_id != claims.sub || record.token_type != expected {
            return Err(AuthError::unauthorized("token record mismatch"));
        }

        Ok(AuthenticatedToken {
            claims,
            token_hash,
            token: token.to_owned(),
        })
    }

    /// The session named in the claims exists, belongs to the subject and is
    /// still usable.
    pub async fn validate_session(&self, claims: &TokenClaims) -> AuthResult<UserSession> {
        let session = self
            .find_session(claims.sub, claims.sid)
            .await?
            .ok_or(AuthError::unauthorized("session not found"))?;

        if session.user_id != claims.sub || !session.is_usable(Utc::now()) {
            return Err(AuthError::unauthorized("session inactive"));
        }

        Ok(session)
    }

    /// A blacklist read that fails is treated as "not blacklisted": revoked
    /// tokens are also gone from the store, which the next step consults.
    async fn is_blacklisted(&self, token_hash: &TokenHash) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };

        match cache.exists(&keys::blacklist(token_hash)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Blacklist lookup failed, relying on store");
                false
            }
        }
    }

    /// Cache first, store on miss or cache failure. Store hits are mirrored
    /// back into the cache.
    async fn find_token(
        &self,
        user_id: UserId,
        token_hash: &TokenHash,
    ) -> AuthResult<Option<UserToken>> {
        if let Some(cache) = &self.cache {
            match cache
                .get_json::<UserToken>(&keys::token(user_id, token_hash))
                .await
            {
                Ok(Some(token)) => return Ok(Some(token)),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Token cache read failed"),
            }
        }

        let token = self.store.find_token_by_hash(token_hash).await?;
        if let Some(token) = &token {
            self.mirror_token(token).await;
        }
        Ok(token)
    }

    async fn find_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> AuthResult<Option<UserSession>> {
        if let Some(cache) = &self.cache {
            match cache
                .get_json::<UserSession>(&keys::session(user_id, session_id))
                .await
            {
                Ok(Some(session)) => return Ok(Some(session)),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Session cache read failed"),
            }
        }

        let session = self.store.find_session(session_id).await?;
        if let Some(session) = &session {
            self.mirror_session(session).await;
        }
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Issuance
    // ------------------------------------------------------------------------

    /// Sign a token of `typ` for the user's session. Access tokens minted
    /// outside login carry a unique id (`unique = true`).
    pub fn issue(
        &self,
        user: &User,
        session_id: SessionId,
        device: &DeviceContext,
        typ: TokenType,
        unique: bool,
    ) -> AuthResult<IssuedToken> {
        let mut claims = self
            .codec
            .claims_for(user, session_id, &device.device_id, typ);
        if unique {
            claims = claims.with_unique_id();
        }

        let token = self.codec.issue(&claims)?;
        let record = UserToken::new(
            user.id,
            TokenHash::of(&token),
            typ,
            claims.expires_at(),
            device.ip_string(),
            device.user_agent.clone(),
        );

        Ok(IssuedToken {
            token,
            claims,
            record,
        })
    }

    /// Persist the token record, then mirror it into the cache.
    pub async fn persist(&self, issued: &IssuedToken) -> AuthResult<()> {
        self.store.create_token(&issued.record).await?;
        self.mirror_token(&issued.record).await;
        Ok(())
    }

    /// Best-effort cache write of a token record, TTL = its remaining life.
    pub async fn mirror_token(&self, token: &UserToken) {
        let Some(cache) = &self.cache else {
            return;
        };
        let ttl = token.remaining_ttl(Utc::now());
        if ttl.is_zero() {
            return;
        }

        let key = keys::token(token.user_id, &token.token_hash);
        if let Err(e) = cache.set_json(&key, token, ttl).await {
            tracing::warn!(user_id = %token.user_id, error = %e, "Failed to cache token");
        }
    }

    /// Best-effort cache write of a session, TTL = time until it expires.
    pub async fn mirror_session(&self, session: &UserSession) {
        let Some(cache) = &self.cache else {
            return;
        };
        let ttl = (session.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if ttl.is_zero() {
            return;
        }

        let key = keys::session(session.user_id, session.id);
        if let Err(e) = cache.set_json(&key, session, ttl).await {
            tracing::warn!(
                user_id = %session.user_id,
                session_id = %session.id,
                error = %e,
                "Failed to cache session"
            );
        }
    }

    // ------------------------------------------------------------------------
    // Revocation
    // ------------------------------------------------------------------------

    /// Revoke one session: its access token and its refresh token.
    ///
    /// Both hashes are blacklisted in one batch before anything is deleted.
    /// A failed blacklist write aborts the revocation with nothing deleted.
    pub async fn revoke(
        &self,
        access_token_hash: &TokenHash,
        user_id: UserId,
        session_id: SessionId,
    ) -> AuthResult<()> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(AuthError::SessionNotFound)?;

        let mut hashes = vec![access_token_hash.clone()];
        if session.refresh_token_hash != *access_token_hash {
            hashes.push(session.refresh_token_hash.clone());
        }

        let mut live = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            if let Some(token) = self.store.find_token_by_hash(hash).await? {
                live.push(token);
            }
        }

        self.blacklist(&live).await?;

        self.store.delete_tokens(&hashes).await?;
        self.store.delete_session(session_id).await?;

        if let Some(cache) = &self.cache {
            let mut stale: Vec<String> = hashes.iter().map(|h| keys::token(user_id, h)).collect();
            stale.push(keys::session(user_id, session_id));
            if let Err(e) = cache.delete(&stale).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to clear revoked session from cache");
            }
        }

        tracing::info!(user_id = %user_id, session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every session of the user.
    ///
    /// Sessions are deactivated, not deleted. When the cache is enabled and
    /// the blacklist batch fails, nothing else happens and the error is
    /// returned.
    pub async fn revoke_all(&self, user_id: UserId) -> AuthResult<RevokeAllOutcome> {
        let live = self
            .store
            .find_live_tokens_for_user(user_id, Utc::now())
            .await?;

        if let Err(e) = self.blacklist(&live).await {
            tracing::error!(user_id = %user_id, error = %e, "Logout-all aborted: blacklist write failed");
            return Err(e);
        }

        let tokens_revoked = self.store.delete_user_tokens(user_id).await?;
        let sessions_deactivated = self.store.deactivate_user_sessions(user_id).await?;

        if let Some(cache) = &self.cache {
            for pattern in [keys::user_tokens(user_id), keys::user_sessions(user_id)] {
                if let Err(e) = cache.delete_pattern(&pattern).await {
                    tracing::warn!(
                        user_id = %user_id,
                        pattern = %pattern,
                        error = %e,
                        "Cache cleanup after logout-all failed; entries will expire"
                    );
                }
            }
        }

        tracing::info!(
            user_id = %user_id,
            tokens_revoked,
            sessions_deactivated,
            "All sessions revoked"
        );

        Ok(RevokeAllOutcome {
            tokens_revoked,
            sessions_deactivated,
        })
    }

    /// Blacklist the tokens in one atomic batch with TTL = the longest
    /// remaining lifetime among them. Tokens with no life left are skipped.
    async fn blacklist(&self, tokens: &[UserToken]) -> AuthResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let now = Utc::now();
        let mut max_ttl = Duration::ZERO;
        let mut entries = Vec::with_capacity(tokens.len());
        for token in tokens {
            let ttl = token.remaining_ttl(now);
            if ttl.is_zero() {
                continue;
            }
            max_ttl = max_ttl.max(ttl);
            entries.push((keys::blacklist(&token.token_hash), "1".to_string()));
        }

        cache.set_many(&entries, max_ttl).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("bearer   abc "), Some("abc"));
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer(""), None);
        assert_eq!(extract_bearer("Bear"), None);
    }
}
