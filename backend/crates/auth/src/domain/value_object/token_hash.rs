//! Token hash
//!
//! Raw bearer tokens are never stored. Every lookup, blacklist entry and
//! database row is keyed by the SHA-256 of the raw string.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hash a raw token string.
    pub fn of(raw_token: &str) -> Self {
        Self(platform::crypto::sha256_hex(raw_token))
    }

    /// Wrap a digest that was already computed (e.g. read back from storage).
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
