//! In-memory cache store for tests and single-process development

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::cache::CacheStore;
use crate::errors::CoreResult;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// HashMap-backed cache with real TTL semantics
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live entries, for assertions in tests
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        let live = entries.get(key).map(|e| !e.is_expired()).unwrap_or(false);
        if live {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn invalidate_pattern(&self, pattern: &str) -> CoreResult<u64> {
        let mut entries = self.entries.write().await;
        let keys: Vec<String> = entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        Ok(keys.len() as u64)
    }
}

/// Glob matching supporting `*` wildcards only, which is all the domain
/// key patterns use
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == candidate;
    }

    let mut remainder = candidate;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match remainder.strip_prefix(part) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if i == parts.len() - 1 && !pattern.ends_with('*') {
            return remainder.ends_with(part);
        } else {
            match remainder.find(part) {
                Some(pos) => remainder = &remainder[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();

        cache
            .set("k1", "v1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k1").await.unwrap(), Some("v1".to_string()));

        assert!(cache.delete("k1").await.unwrap());
        assert_eq!(cache.get("k1").await.unwrap(), None);
        assert!(!cache.delete("k1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = MemoryCache::new();

        cache
            .set("short", "v", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_nx() {
        let cache = MemoryCache::new();

        assert!(cache
            .set_nx("lock", "1", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!cache
            .set_nx("lock", "2", Duration::from_secs(60))
            .await
            .unwrap());

        // Expired entries do not block acquisition
        cache
            .set("stale", "1", Duration::from_millis(5))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(cache
            .set_nx("stale", "2", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_pattern_invalidation() {
        let cache = MemoryCache::new();

        cache
            .set("girok:doc:latest:TOS:en", "a", Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("girok:doc:latest:TOS:ko", "b", Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("girok:law:code:GDPR", "c", Duration::from_secs(60))
            .await
            .unwrap();

        let removed = cache
            .invalidate_pattern("girok:doc:latest:TOS:*")
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("a:*", "a:b"));
        assert!(glob_match("a:*:c", "a:b:c"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("a:*", "b:a"));
        assert!(!glob_match("exact", "exactly"));
    }
}
