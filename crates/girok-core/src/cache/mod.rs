//! Shared cache with domain key helpers and a single-flight lock
//!
//! Every key is prefixed with the service namespace and one of the
//! domain families. TTLs are fixed per data class. `get_or_compute`
//! suppresses thundering herds with a short named lock; token
//! revocation lookups are fail-secure and propagate backend errors so
//! the auth guard treats unknown state as revoked.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{CoreError, CoreResult};

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Service-wide key namespace
pub const KEY_PREFIX: &str = "girok";

/// Standard TTLs per data class
pub struct CacheTtl;

impl CacheTtl {
    /// Laws, services
    pub const STATIC_CONFIG: Duration = Duration::from_secs(24 * 60 * 60);
    /// Legal documents
    pub const SEMI_STATIC: Duration = Duration::from_secs(15 * 60);
    /// Accounts, consents
    pub const USER_DATA: Duration = Duration::from_secs(5 * 60);
    /// Session-by-token
    pub const SESSION: Duration = Duration::from_secs(30 * 60);
    /// Per-IP counters
    pub const SHORT_LIVED: Duration = Duration::from_secs(60);
    /// Live metrics
    pub const EPHEMERAL: Duration = Duration::from_secs(10);
    /// Username to account-id lookups
    pub const LOOKUP: Duration = Duration::from_secs(2 * 60 * 60);
}

/// Lifetime of a single-flight lock entry
pub const LOCK_TTL: Duration = Duration::from_secs(5);

/// How long `get_or_compute` waits on a contended lock before assuming
/// the holder died and computing anyway
const LOCK_RETRY_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Builders for the namespaced key families
pub struct CacheKeys;

impl CacheKeys {
    pub fn account_id(id: &Uuid) -> String {
        format!("{KEY_PREFIX}:account:id:{id}")
    }

    pub fn account_email(email: &str) -> String {
        format!("{KEY_PREFIX}:account:email:{}", email.to_lowercase())
    }

    pub fn username_lookup(username: &str) -> String {
        format!("{KEY_PREFIX}:account:username:{username}")
    }

    pub fn session_token(session_id: &Uuid) -> String {
        format!("{KEY_PREFIX}:session:token:{session_id}")
    }

    pub fn revoked(jti: &str) -> String {
        format!("{KEY_PREFIX}:revoked:{jti}")
    }

    pub fn permissions(account_id: &Uuid) -> String {
        format!("{KEY_PREFIX}:permissions:{account_id}")
    }

    pub fn mfa_challenge(challenge_id: &str) -> String {
        format!("{KEY_PREFIX}:mfa:challenge:{challenge_id}")
    }

    pub fn law_code(code: &str) -> String {
        format!("{KEY_PREFIX}:law:code:{code}")
    }

    pub fn doc_latest(doc_type: &str, locale: &str) -> String {
        format!("{KEY_PREFIX}:doc:latest:{doc_type}:{locale}")
    }

    pub fn consent_status(account_id: &Uuid, document_id: &Uuid) -> String {
        format!("{KEY_PREFIX}:consent:status:{account_id}:{document_id}")
    }

    pub fn dsr_id(id: &Uuid) -> String {
        format!("{KEY_PREFIX}:dsr:id:{id}")
    }

    pub fn lock(key: &str) -> String {
        format!("{KEY_PREFIX}:lock:{key}")
    }

    /// Every account-scoped key family, for bulk invalidation
    pub fn account_pattern(id: &Uuid) -> String {
        format!("{KEY_PREFIX}:account:id:{id}*")
    }

    /// Every latest-document key for a document type
    pub fn doc_latest_pattern(doc_type: &str) -> String {
        format!("{KEY_PREFIX}:doc:latest:{doc_type}:*")
    }
}

/// Backend-agnostic cache store
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CoreResult<()>;

    async fn delete(&self, key: &str) -> CoreResult<bool>;

    /// Atomic set-if-absent with TTL; returns true when the key was set
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CoreResult<bool>;

    /// Delete all keys matching a glob pattern, returning the count.
    ///
    /// Backends that cannot enumerate keys in O(matched) return 0 and
    /// log; callers must never block correctness on the result.
    async fn invalidate_pattern(&self, pattern: &str) -> CoreResult<u64>;
}

/// Domain cache built over a [`CacheStore`]
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> CoreResult<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .map_err(|e| CoreError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CoreResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw, ttl).await
    }

    pub async fn delete(&self, key: &str) -> CoreResult<bool> {
        self.store.delete(key).await
    }

    pub async fn invalidate_pattern(&self, pattern: &str) -> CoreResult<u64> {
        self.store.invalidate_pattern(pattern).await
    }

    /// Read-through with single-flight miss suppression
    ///
    /// On a miss, one caller takes the `lock:<key>` entry and runs the
    /// factory; contenders poll the cache. The lock is released on every
    /// exit path, including factory failure. If the lock holder dies,
    /// waiters fall through after the lock TTL and compute themselves.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        factory: F,
    ) -> CoreResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        if let Some(hit) = self.get_json(key).await? {
            return Ok(hit);
        }

        let lock_key = CacheKeys::lock(key);
        let acquired = self.acquire_lock(&lock_key, key).await?;

        let result = async {
            // Re-read: a contender may have filled the entry while we
            // waited on the lock.
            if let Some(hit) = self.get_json(key).await? {
                return Ok(hit);
            }
            let value = factory().await?;
            self.set_json(key, &value, ttl).await?;
            Ok(value)
        }
        .await;

        if acquired {
            if let Err(e) = self.store.delete(&lock_key).await {
                warn!(key, error = %e, "failed to release cache lock");
            }
        }

        result
    }

    async fn acquire_lock(&self, lock_key: &str, key: &str) -> CoreResult<bool> {
        for _ in 0..LOCK_RETRY_ATTEMPTS {
            if self.store.set_nx(lock_key, "1", LOCK_TTL).await? {
                return Ok(true);
            }
            tokio::time::sleep(LOCK_RETRY_DELAY).await;
            if self.store.get(key).await?.is_some() {
                // Holder finished; the caller's re-read will hit.
                return Ok(false);
            }
        }
        debug!(key, "cache lock wait exhausted, computing without lock");
        Ok(false)
    }

    /// Mark a token ID revoked until its natural expiry
    pub async fn revoke_token(&self, jti: &str, ttl: Duration) -> CoreResult<()> {
        self.store.set(&CacheKeys::revoked(jti), "1", ttl).await
    }

    /// Fail-secure revocation lookup
    ///
    /// Backend errors propagate: the auth guard must treat unknown
    /// revocation state as revoked, never as valid.
    pub async fn is_token_revoked(&self, jti: &str) -> CoreResult<bool> {
        Ok(self.store.get(&CacheKeys::revoked(jti)).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store double whose every operation fails, for fail-secure tests
    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> CoreResult<Option<String>> {
            Err(CoreError::cache("backend down"))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CoreResult<()> {
            Err(CoreError::cache("backend down"))
        }

        async fn delete(&self, _key: &str) -> CoreResult<bool> {
            Err(CoreError::cache("backend down"))
        }

        async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> CoreResult<bool> {
            Err(CoreError::cache("backend down"))
        }

        async fn invalidate_pattern(&self, _pattern: &str) -> CoreResult<u64> {
            Err(CoreError::cache("backend down"))
        }
    }

    #[test]
    fn test_key_families() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKeys::account_id(&id),
            "girok:account:id:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            CacheKeys::account_email("Alice@Example.COM"),
            "girok:account:email:alice@example.com"
        );
        assert_eq!(CacheKeys::law_code("GDPR"), "girok:law:code:GDPR");
        assert_eq!(
            CacheKeys::doc_latest("TERMS_OF_SERVICE", "en"),
            "girok:doc:latest:TERMS_OF_SERVICE:en"
        );
        assert_eq!(CacheKeys::lock("a:b"), "girok:lock:a:b");
    }

    #[test]
    fn test_standard_ttls() {
        assert_eq!(CacheTtl::STATIC_CONFIG, Duration::from_secs(86_400));
        assert_eq!(CacheTtl::SEMI_STATIC, Duration::from_secs(900));
        assert_eq!(CacheTtl::USER_DATA, Duration::from_secs(300));
        assert_eq!(CacheTtl::SESSION, Duration::from_secs(1_800));
        assert_eq!(CacheTtl::SHORT_LIVED, Duration::from_secs(60));
        assert_eq!(CacheTtl::EPHEMERAL, Duration::from_secs(10));
        assert_eq!(CacheTtl::LOOKUP, Duration::from_secs(7_200));
    }

    #[tokio::test]
    async fn test_get_or_compute_runs_factory_once_per_miss() {
        let cache = Cache::new(Arc::new(MemoryCache::new()));
        let calls = AtomicU32::new(0);

        let value: String = cache
            .get_or_compute("girok:test:key", CacheTtl::USER_DATA, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("computed".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Second call hits the cache and never reaches the factory
        let value: String = cache
            .get_or_compute("girok:test:key", CacheTtl::USER_DATA, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("recomputed".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "computed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_releases_lock_on_factory_error() {
        let cache = Cache::new(Arc::new(MemoryCache::new()));

        let failed: CoreResult<String> = cache
            .get_or_compute("girok:test:fail", CacheTtl::USER_DATA, || async {
                Err(CoreError::internal("factory exploded"))
            })
            .await;
        assert!(failed.is_err());

        // Lock must be gone: a retry computes immediately
        let value: String = cache
            .get_or_compute("girok:test:fail", CacheTtl::USER_DATA, || async {
                Ok("second try".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "second try");
    }

    #[tokio::test]
    async fn test_token_revocation_roundtrip() {
        let cache = Cache::new(Arc::new(MemoryCache::new()));

        assert!(!cache.is_token_revoked("jti-1").await.unwrap());
        cache
            .revoke_token("jti-1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.is_token_revoked("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_revocation_is_fail_secure() {
        let cache = Cache::new(Arc::new(FailingStore));

        // Never a silent `false`: the error reaches the caller, which
        // must treat it as revoked.
        assert!(cache.is_token_revoked("jti-1").await.is_err());
    }
}
