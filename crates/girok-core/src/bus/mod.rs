//! Event bus client
//!
//! Downstream delivery target for the outbox publisher. The Redis
//! implementation appends envelopes to a stream per topic; the
//! in-memory implementation records them for test assertions.
//! Delivery is at-least-once; consumers dedupe on
//! `(aggregate_id, event_type, created_at)`.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client as RedisClient};
use std::sync::Mutex;
use tracing::info;

use crate::errors::{CoreError, CoreResult};

/// Stream key prefix for published events
pub const STREAM_PREFIX: &str = "girok:events";

/// Downstream message bus
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Deliver one serialized envelope to a topic
    async fn publish(&self, topic: &str, payload: &str) -> CoreResult<()>;
}

/// Redis-streams event bus
#[derive(Clone)]
pub struct RedisEventBus {
    connection_manager: ConnectionManager,
}

impl RedisEventBus {
    pub async fn new(redis_url: &str) -> CoreResult<Self> {
        let client = RedisClient::open(redis_url)
            .map_err(|e| CoreError::bus(format!("Failed to create Redis client: {e}")))?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CoreError::bus(format!("Failed to create connection manager: {e}")))?;

        info!("Redis event bus connection established");
        Ok(Self { connection_manager })
    }

    fn stream_key(topic: &str) -> String {
        format!("{STREAM_PREFIX}:{topic}")
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, topic: &str, payload: &str) -> CoreResult<()> {
        let mut conn = self.connection_manager.clone();
        let key = Self::stream_key(topic);

        redis::cmd("XADD")
            .arg(&key)
            .arg("*")
            .arg("payload")
            .arg(payload)
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| CoreError::bus(format!("XADD {key} failed: {e}")))?;

        Ok(())
    }
}

/// In-memory bus recording published envelopes, for tests
#[derive(Default)]
pub struct MemoryEventBus {
    published: Mutex<Vec<(String, String)>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(topic, payload)` pairs published so far
    pub fn published(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published()
            .into_iter()
            .map(|(topic, _)| topic)
            .collect()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, topic: &str, payload: &str) -> CoreResult<()> {
        let mut published = self
            .published
            .lock()
            .map_err(|_| CoreError::bus("memory bus poisoned"))?;
        published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_bus_records_in_order() {
        let bus = MemoryEventBus::new();

        bus.publish("sanction", r#"{"a":1}"#).await.unwrap();
        bus.publish("consent", r#"{"b":2}"#).await.unwrap();

        let published = bus.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "sanction");
        assert_eq!(published[1].0, "consent");
    }

    #[test]
    fn test_stream_key() {
        assert_eq!(
            RedisEventBus::stream_key("dsr_request"),
            "girok:events:dsr_request"
        );
    }
}
