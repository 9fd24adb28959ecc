//! Redis cache backend

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{CacheResult, ttl_secs};

/// SCAN batch size for pattern deletes
const SCAN_COUNT: usize = 200;

/// Redis-backed cache. Cloning shares the underlying multiplexed connection,
/// which reconnects on its own after a drop.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    /// MULTI/EXEC pipeline of SETEX commands.
    pub async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> CacheResult<()> {
        let secs = ttl_secs(ttl);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.set_ex(key, value, secs).ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    /// Cursor-based SCAN + DEL; never KEYS, which blocks the server.
    pub async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let n: u64 = conn.del(&keys).await?;
                removed += n;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }
}
