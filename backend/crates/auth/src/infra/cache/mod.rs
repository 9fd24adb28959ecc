//! Cache store
//!
//! The cache mirrors sessions, tokens and effective permission sets, and
//! holds the revocation blacklist. It is an accelerator only: the durable
//! store stays authoritative and every read has a store fallback.
//!
//! The backend is picked once at start-up. The engine holds
//! `Option<Arc<CacheStore>>`; `None` means caching is disabled.

pub mod keys;
pub mod memory;
pub mod redis;

use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("cache payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Cache backends
#[derive(Clone)]
pub enum CacheStore {
    Redis(RedisCache),
    Memory(MemoryCache),
}

impl CacheStore {
    pub fn memory() -> Self {
        Self::Memory(MemoryCache::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Redis(c) => c.get(key).await,
            Self::Memory(c) => c.get(key),
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Redis(c) => c.set(key, value, ttl).await,
            Self::Memory(c) => c.set(key, value, ttl),
        }
    }

    /// Write every entry with one TTL in a single atomic batch. Either all
    /// entries are written or the call fails.
    pub async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        match self {
            Self::Redis(c) => c.set_many(entries, ttl).await,
            Self::Memory(c) => c.set_many(entries, ttl),
        }
    }

    pub async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        match self {
            Self::Redis(c) => c.delete(keys).await,
            Self::Memory(c) => c.delete(keys),
        }
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Redis(c) => c.exists(key).await,
            Self::Memory(c) => c.exists(key),
        }
    }

    /// Delete every key matching a glob pattern (`*` wildcard).
    pub async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        match self {
            Self::Redis(c) => c.delete_pattern(pattern).await,
            Self::Memory(c) => c.delete_pattern(pattern),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl).await
    }
}

/// Whole seconds for a TTL, rounded up and never zero (a zero expiry is
/// rejected by Redis and would mean "already gone" anyway).
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
