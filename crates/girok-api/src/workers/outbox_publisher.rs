//! Outbox publisher worker
//!
//! Drains unpublished outbox rows to the event bus, oldest first.
//! Delivery is at-least-once: a row is marked published only after the
//! bus accepts it, and failures back off exponentially without ever
//! dropping the row.

use chrono::Utc;
use girok_core::bus::EventBus;
use girok_core::events::EventEnvelope;
use girok_db::repositories::OutboxRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Rows fetched per poll
const BATCH_SIZE: u64 = 100;

pub struct OutboxPublisher {
    outbox: OutboxRepository,
    bus: Arc<dyn EventBus>,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl OutboxPublisher {
    pub fn new(
        outbox: OutboxRepository,
        bus: Arc<dyn EventBus>,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            outbox,
            bus,
            poll_interval,
            shutdown,
        }
    }

    /// Run until shutdown
    pub async fn run(mut self) {
        info!("outbox publisher started");
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_once().await {
                        error!(error = %e, "outbox drain failed");
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("outbox publisher stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Publish one batch; callable directly from tests
    pub async fn drain_once(&self) -> Result<u64, girok_db::DbError> {
        let due = self.outbox.fetch_due(BATCH_SIZE).await?;
        if due.is_empty() {
            return Ok(0);
        }

        let mut published = 0;
        for row in due {
            let envelope = EventEnvelope {
                aggregate_type: parse_aggregate(&row.aggregate_type),
                aggregate_id: row.aggregate_id,
                event_type: row.event_type.clone(),
                payload: row.payload.clone(),
                occurred_at: row.created_at,
            };
            let payload = match serde_json::to_string(&envelope) {
                Ok(payload) => payload,
                Err(e) => {
                    // Unserializable rows would wedge the queue head;
                    // back them off like a delivery failure
                    error!(event_id = %row.id, error = %e, "outbox row failed to serialize");
                    self.outbox.mark_failed(row.id, row.retry_count).await?;
                    continue;
                }
            };

            match self.bus.publish(&row.aggregate_type, &payload).await {
                Ok(()) => {
                    self.outbox.mark_published(row.id).await?;
                    published += 1;
                    debug!(event_id = %row.id, event_type = %row.event_type, "event published");
                }
                Err(e) => {
                    warn!(
                        event_id = %row.id,
                        retry_count = row.retry_count,
                        error = %e,
                        "event delivery failed, backing off"
                    );
                    self.outbox.mark_failed(row.id, row.retry_count).await?;
                }
            }
        }

        if published > 0 {
            debug!(published, at = %Utc::now(), "outbox batch drained");
        }
        Ok(published)
    }
}

fn parse_aggregate(raw: &str) -> girok_core::events::AggregateType {
    use girok_core::events::AggregateType;
    match raw {
        "account" => AggregateType::Account,
        "session" => AggregateType::Session,
        "sanction" => AggregateType::Sanction,
        "consent" => AggregateType::Consent,
        _ => AggregateType::DsrRequest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use girok_core::events::AggregateType;

    #[test]
    fn test_parse_aggregate() {
        assert_eq!(parse_aggregate("account"), AggregateType::Account);
        assert_eq!(parse_aggregate("sanction"), AggregateType::Sanction);
        assert_eq!(parse_aggregate("dsr_request"), AggregateType::DsrRequest);
        // Unknown types default to the DSR family rather than dropping
        assert_eq!(parse_aggregate("mystery"), AggregateType::DsrRequest);
    }
}
