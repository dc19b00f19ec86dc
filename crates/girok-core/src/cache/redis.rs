//! Redis-backed cache store

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client as RedisClient};
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::errors::{CoreError, CoreResult};

/// Cache store over a shared Redis connection manager
#[derive(Clone)]
pub struct RedisCache {
    connection_manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis and build the store
    pub async fn new(redis_url: &str) -> CoreResult<Self> {
        let client = RedisClient::open(redis_url)
            .map_err(|e| CoreError::cache(format!("Failed to create Redis client: {e}")))?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CoreError::cache(format!("Failed to create connection manager: {e}")))?;

        info!("Redis cache connection established");
        Ok(Self { connection_manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        let mut conn = self.connection_manager.clone();
        conn.get(key)
            .await
            .map_err(|e| CoreError::cache(format!("GET {key} failed: {e}")))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CoreResult<()> {
        let mut conn = self.connection_manager.clone();
        conn.set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| CoreError::cache(format!("SET {key} failed: {e}")))
    }

    async fn delete(&self, key: &str) -> CoreResult<bool> {
        let mut conn = self.connection_manager.clone();
        let removed: u64 = conn
            .del(key)
            .await
            .map_err(|e| CoreError::cache(format!("DEL {key} failed: {e}")))?;
        Ok(removed > 0)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> CoreResult<bool> {
        let mut conn = self.connection_manager.clone();
        // SET key value NX PX <ms> — atomic acquire with expiry
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| CoreError::cache(format!("SET NX {key} failed: {e}")))?;
        Ok(reply.is_some())
    }

    async fn invalidate_pattern(&self, pattern: &str) -> CoreResult<u64> {
        let mut conn = self.connection_manager.clone();
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| CoreError::cache(format!("SCAN {pattern} failed: {e}")))?;

            if !keys.is_empty() {
                let batch: u64 = conn
                    .del(&keys)
                    .await
                    .map_err(|e| CoreError::cache(format!("DEL batch failed: {e}")))?;
                removed += batch;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern, removed, "pattern invalidation complete");
        Ok(removed)
    }
}
