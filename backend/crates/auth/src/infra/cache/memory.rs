//! In-process cache backend
//!
//! Single-node deployments and tests. An expired entry is removed when a
//! read finds it, and every [`SWEEP_INTERVAL`] writes drop all expired
//! entries under the write lock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::CacheResult;

/// Writes between full sweeps of expired entries
pub const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: RwLock<HashMap<String, Entry>>,
    writes: AtomicUsize,
    #[cfg(test)]
    failing: std::sync::atomic::AtomicBool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<Inner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, simulating an unreachable cache.
    #[cfg(test)]
    pub(crate) fn set_failing(&self, failing: bool) {
        self.inner
            .failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> CacheResult<()> {
        #[cfg(test)]
        {
            if self.inner.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(super::CacheError::Unavailable("injected failure".into()));
            }
        }
        Ok(())
    }

    /// Number of stored entries, live or not yet evicted
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// True when this write should sweep expired entries first
    fn sweep_due(&self) -> bool {
        (self.inner.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0
    }

    fn sweep(map: &mut HashMap<String, Entry>, now: Instant) {
        let before = map.len();
        map.retain(|_, e| e.is_live(now));
        let evicted = before - map.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Memory cache sweep");
        }
    }

    pub fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check()?;
        let now = Instant::now();
        {
            let entries = self.inner.entries.read();
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if e.is_live(now) => return Ok(Some(e.value.clone())),
                Some(_) => {}
            }
        }

        // expired: evict, unless a writer replaced it in between
        let mut entries = self.inner.entries.write();
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    pub fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.check()?;
        let now = Instant::now();
        let expires_at = now + ttl;
        let mut map = self.inner.entries.write();
        if self.sweep_due() {
            Self::sweep(&mut map, now);
        }
        map.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    /// All entries land under one write lock, so readers see none or all.
    pub fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> CacheResult<()> {
        self.check()?;
        let now = Instant::now();
        let expires_at = now + ttl;
        let mut map = self.inner.entries.write();
        if self.sweep_due() {
            Self::sweep(&mut map, now);
        }
        for (key, value) in entries {
            map.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    pub fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        self.check()?;
        let now = Instant::now();
        let mut map = self.inner.entries.write();
        let removed = keys
            .iter()
            .filter_map(|k| map.remove(k))
            .filter(|e| e.is_live(now))
            .count();
        Ok(removed as u64)
    }

    pub fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    pub fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        self.check()?;
        let now = Instant::now();
        let mut map = self.inner.entries.write();
        let mut live_removed = 0u64;
        map.retain(|key, entry| {
            if glob_match(pattern, key) {
                if entry.is_live(now) {
                    live_removed += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(live_removed)
    }
}

/// Redis-style glob restricted to the `*` wildcard.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // no wildcard at all
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("auth:perm:*", "auth:perm:123"));
        assert!(glob_match("auth:token:u1:*", "auth:token:u1:abc"));
        assert!(!glob_match("auth:token:u1:*", "auth:token:u2:abc"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(!glob_match("a*c*e", "abcd"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn test_set_get_expire() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));

        cache.set("gone", "v", Duration::ZERO).unwrap();
        assert_eq!(cache.get("gone").unwrap(), None);
        assert!(!cache.exists("gone").unwrap());
    }

    #[test]
    fn test_reads_evict_expired_entries() {
        let cache = MemoryCache::new();
        for i in 0..1000 {
            let key = format!("auth:blacklist:{i}");
            cache.set(&key, "1", Duration::ZERO).unwrap();
            assert_eq!(cache.get(&key).unwrap(), None);
            assert!(!cache.exists(&key).unwrap());
        }
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_writes_sweep_expired_entries() {
        let cache = MemoryCache::new();
        for i in 0..SWEEP_INTERVAL - 1 {
            cache.set(&format!("stale:{i}"), "1", Duration::ZERO).unwrap();
        }
        assert_eq!(cache.len(), SWEEP_INTERVAL - 1);

        cache.set("fresh", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_delete_pattern_only_touches_matching() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("auth:perm:1", "a", ttl).unwrap();
        cache.set("auth:perm:2", "b", ttl).unwrap();
        cache.set("auth:token:1:x", "c", ttl).unwrap();

        assert_eq!(cache.delete_pattern("auth:perm:*").unwrap(), 2);
        assert!(cache.exists("auth:token:1:x").unwrap());
        assert!(!cache.exists("auth:perm:1").unwrap());
    }

    #[test]
    fn test_injected_failure() {
        let cache = MemoryCache::new();
        cache.set_failing(true);
        assert!(cache.get("k").is_err());
        assert!(cache.set_many(&[("a".into(), "b".into())], Duration::from_secs(1)).is_err());
        cache.set_failing(false);
        assert!(cache.get("k").unwrap().is_none());
    }
}
