//! Transactional outbox repository
//!
//! `append` inserts inside the caller's transaction so the state
//! mutation and the intent to emit commit or roll back together. The
//! publisher worker drains due rows, delivers them to the bus, and
//! marks `published_at`; failures back off exponentially and rows are
//! never deleted.

use crate::entities::outbox_event::{ActiveModel, Column, Entity, Model};
use crate::error::{DbError, DbResult};
use chrono::{Duration, Utc};
use girok_core::events::{AggregateType, EventType};
use girok_core::ids::uuid7;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Backoff base for failed deliveries
const RETRY_BASE_SECS: i64 = 1;

/// Backoff cap
const RETRY_CAP_SECS: i64 = 300;

/// An event to append inside a transaction
#[derive(Debug, Clone)]
pub struct NewOutboxEvent {
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl NewOutboxEvent {
    pub fn new(
        aggregate_type: AggregateType,
        aggregate_id: Uuid,
        event_type: EventType,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_type,
            aggregate_id,
            event_type: event_type.as_str().to_string(),
            payload,
        }
    }

    /// An event under a custom topic token, for summaries that are not
    /// tied to the catalog
    pub fn custom(
        aggregate_type: AggregateType,
        aggregate_id: Uuid,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            aggregate_type,
            aggregate_id,
            event_type: event_type.to_string(),
            payload,
        }
    }
}

/// Outbox repository
#[derive(Clone)]
pub struct OutboxRepository {
    db: Arc<DatabaseConnection>,
}

impl OutboxRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an event row inside the caller's transaction
    pub async fn append<C: ConnectionTrait>(
        &self,
        conn: &C,
        event: NewOutboxEvent,
    ) -> DbResult<Model> {
        let now = Utc::now();
        let row = ActiveModel {
            id: Set(uuid7::generate()),
            aggregate_type: Set(event.aggregate_type.as_str().to_string()),
            aggregate_id: Set(event.aggregate_id),
            event_type: Set(event.event_type),
            payload: Set(event.payload),
            created_at: Set(now),
            published_at: Set(None),
            retry_count: Set(0),
            next_attempt_at: Set(now),
        };

        row.insert(conn).await.map_err(DbError::from)
    }

    /// Fetch unpublished rows that are due, oldest first
    pub async fn fetch_due(&self, limit: u64) -> DbResult<Vec<Model>> {
        Entity::find()
            .filter(Column::PublishedAt.is_null())
            .filter(Column::NextAttemptAt.lte(Utc::now()))
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)
    }

    /// Mark a row delivered
    pub async fn mark_published(&self, id: Uuid) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(
                Column::PublishedAt,
                sea_orm::sea_query::Expr::value(Some(Utc::now())),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Record a delivery failure and schedule the next attempt
    ///
    /// `next_attempt_at = now + min(2^retry_count * base, cap)`. The row
    /// stays forever; after enough failures an operator sweep picks it
    /// up.
    pub async fn mark_failed(&self, id: Uuid, previous_retry_count: i32) -> DbResult<()> {
        let retry_count = previous_retry_count.saturating_add(1);
        let backoff = backoff_secs(retry_count);

        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(
                Column::RetryCount,
                sea_orm::sea_query::Expr::value(retry_count),
            )
            .col_expr(
                Column::NextAttemptAt,
                sea_orm::sea_query::Expr::value(Utc::now() + Duration::seconds(backoff)),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        debug!(event_id = %id, retry_count, backoff_secs = backoff, "outbox delivery backed off");
        Ok(())
    }

    /// Number of rows still awaiting delivery
    pub async fn unpublished_count(&self) -> DbResult<u64> {
        Entity::find()
            .filter(Column::PublishedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(DbError::from)
    }
}

/// Exponential backoff with a cap
fn backoff_secs(retry_count: i32) -> i64 {
    let exponent = retry_count.clamp(0, 30) as u32;
    let delay = RETRY_BASE_SECS.saturating_mul(1_i64 << exponent.min(20));
    delay.min(RETRY_CAP_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_secs(1), 2);
        assert_eq!(backoff_secs(2), 4);
        assert_eq!(backoff_secs(3), 8);
        assert_eq!(backoff_secs(8), 256);
        // Capped
        assert_eq!(backoff_secs(9), 300);
        assert_eq!(backoff_secs(30), 300);
    }

    #[test]
    fn test_new_event_uses_catalog_token() {
        let event = NewOutboxEvent::new(
            AggregateType::Sanction,
            Uuid::new_v4(),
            EventType::SanctionApplied,
            serde_json::json!({}),
        );
        assert_eq!(event.event_type, "SANCTION_APPLIED");
        assert_eq!(event.aggregate_type.as_str(), "sanction");
    }

    #[test]
    fn test_custom_topic() {
        let event = NewOutboxEvent::custom(
            AggregateType::DsrRequest,
            Uuid::nil(),
            "dsr.daily.summary",
            serde_json::json!({"pending": 3}),
        );
        assert_eq!(event.event_type, "dsr.daily.summary");
    }
}
