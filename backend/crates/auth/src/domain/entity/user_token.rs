//! User Token Entity
//!
//! One row per issued token. Expiry, use and validity are derived from the
//! timestamps at call time; nothing here is a persisted boolean.

use chrono::{DateTime, Utc};
use kernel::id::{TokenId, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::value_object::{token_hash::TokenHash, token_type::TokenType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserToken {
    pub id: TokenId,
    pub user_id: UserId,
    pub token_hash: TokenHash,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    /// Audit only. Access tokens are marked after validation, refresh tokens
    /// after a refresh.
    pub used_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserToken {
    pub fn new(
        user_id: UserId,
        token_hash: TokenHash,
        token_type: TokenType,
        expires_at: DateTime<Utc>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            id: TokenId::new(),
            user_id,
            token_hash,
            token_type,
            expires_at,
            used_at: None,
            ip_address,
            user_agent,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_used()
    }

    /// Time left before natural expiry; zero once expired.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}
