//! Consent service
//!
//! Grant/withdraw with their outbox events, the cached status lookup,
//! and the daily expiry sweep: expiring-soon notices for the 30-day
//! window and per-row expiry transitions.

use chrono::{DateTime, Duration, Utc};
use girok_core::cache::{Cache, CacheKeys, CacheTtl};
use girok_core::entities::consent::{Consent, ConsentStatus, EXPIRING_SOON_DAYS};
use girok_core::events::{
    AggregateType, ConsentExpiredPayload, ConsentExpiringSoonPayload, EventType,
};
use girok_db::repositories::{ConsentRepository, NewOutboxEvent, OutboxRepository};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::services::legal::LegalService;

/// Counts from one expiry sweep run
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsentSweepOutcome {
    pub expiring_soon_notices: u64,
    pub expired: u64,
}

/// Consent service
#[derive(Clone)]
pub struct ConsentService {
    db: Arc<DatabaseConnection>,
    consents: ConsentRepository,
    outbox: OutboxRepository,
    legal: LegalService,
    cache: Cache,
}

impl ConsentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        consents: ConsentRepository,
        outbox: OutboxRepository,
        legal: LegalService,
        cache: Cache,
    ) -> Self {
        Self {
            db,
            consents,
            outbox,
            legal,
            cache,
        }
    }

    /// Grant a consent to a document
    ///
    /// At most one GRANTED consent per `(account, document)`; granting
    /// again after withdrawal or expiry creates a fresh record.
    pub async fn grant(
        &self,
        account_id: Uuid,
        document_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> ApiResult<Consent> {
        // The document must exist and resolve
        self.legal.get_document(document_id).await?;

        if self
            .consents
            .find_granted(account_id, document_id)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(
                "consent has already been granted for this document".to_string(),
            ));
        }

        if let Some(expiry) = expires_at {
            if expiry <= Utc::now() {
                return Err(ApiError::InvalidInput(
                    "consent expiry must be in the future".to_string(),
                ));
            }
        }

        let consent = Consent::grant(account_id, document_id, expires_at);

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let consent = self.consents.insert(&txn, consent).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Consent,
                    consent.id,
                    EventType::ConsentGranted,
                    json!({
                        "consentId": consent.id,
                        "accountId": account_id,
                        "documentId": document_id,
                        "expiresAt": expires_at,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_status(&account_id, &document_id).await;
        Ok(consent)
    }

    /// Withdraw a granted consent; emits `CONSENT_WITHDRAWN`
    pub async fn withdraw(&self, consent_id: Uuid, account_id: Uuid) -> ApiResult<Consent> {
        let consent = self
            .consents
            .find_by_id(consent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("consent".to_string()))?;

        if consent.account_id != account_id {
            return Err(ApiError::Forbidden);
        }
        if !ConsentStatus::can_transition(consent.status, ConsentStatus::Withdrawn) {
            return Err(ApiError::Precondition(format!(
                "consent is {} and cannot be withdrawn",
                consent.status.as_str()
            )));
        }

        let now = Utc::now();
        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.consents
            .set_status(&txn, consent.id, ConsentStatus::Withdrawn, Some(now))
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Consent,
                    consent.id,
                    EventType::ConsentWithdrawn,
                    json!({
                        "consentId": consent.id,
                        "accountId": consent.account_id,
                        "documentId": consent.document_id,
                        "withdrawnAt": now,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_status(&consent.account_id, &consent.document_id)
            .await;
        info!(consent_id = %consent.id, "consent withdrawn");

        let mut withdrawn = consent;
        withdrawn.status = ConsentStatus::Withdrawn;
        withdrawn.withdrawn_at = Some(now);
        Ok(withdrawn)
    }

    /// Whether an account currently holds a granted consent for a
    /// document, read through the cache
    pub async fn status(&self, account_id: Uuid, document_id: Uuid) -> ApiResult<Option<Consent>> {
        let key = CacheKeys::consent_status(&account_id, &document_id);
        let consents = self.consents.clone();

        let consent: Option<Consent> = self
            .cache
            .get_or_compute(&key, CacheTtl::USER_DATA, || async move {
                consents
                    .find_granted(account_id, document_id)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))
            })
            .await?;

        Ok(consent)
    }

    pub async fn list_for_account(&self, account_id: Uuid) -> ApiResult<Vec<Consent>> {
        Ok(self.consents.list_for_account(account_id).await?)
    }

    /// Daily sweep at 02:00 UTC
    ///
    /// Emits one `CONSENT_EXPIRING_SOON` per row inside the 30-day
    /// window per call (consumers dedupe on `(consent_id, date)`), then
    /// expires rows past their instant, each in its own transaction so
    /// a cancelled batch leaves no half-applied row.
    pub async fn sweep(&self, now: DateTime<Utc>) -> ApiResult<ConsentSweepOutcome> {
        let mut outcome = ConsentSweepOutcome::default();

        let soon = self
            .consents
            .expiring_between(now, now + Duration::days(EXPIRING_SOON_DAYS))
            .await?;
        for consent in soon {
            let Some(days_until_expiry) = consent.days_until_expiry(now) else {
                continue;
            };
            let Some(expires_at) = consent.expires_at else {
                continue;
            };

            let payload = ConsentExpiringSoonPayload {
                consent_id: consent.id,
                account_id: consent.account_id,
                document_id: consent.document_id,
                days_until_expiry,
                expires_at,
            };

            let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
            self.outbox
                .append(
                    &txn,
                    NewOutboxEvent::new(
                        AggregateType::Consent,
                        consent.id,
                        EventType::ConsentExpiringSoon,
                        serde_json::to_value(&payload)
                            .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                )
                .await?;
            txn.commit().await.map_err(girok_db::DbError::from)?;
            outcome.expiring_soon_notices += 1;
        }

        let due = self.consents.expired_due(now).await?;
        for consent in due {
            let Some(expires_at) = consent.expires_at else {
                warn!(consent_id = %consent.id, "expiry sweep saw a row without expires_at");
                continue;
            };

            let payload = ConsentExpiredPayload {
                consent_id: consent.id,
                account_id: consent.account_id,
                document_id: consent.document_id,
                expired_at: expires_at,
            };

            let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
            self.consents
                .set_status(&txn, consent.id, ConsentStatus::Expired, None)
                .await?;
            self.outbox
                .append(
                    &txn,
                    NewOutboxEvent::new(
                        AggregateType::Consent,
                        consent.id,
                        EventType::ConsentExpired,
                        serde_json::to_value(&payload)
                            .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                )
                .await?;
            txn.commit().await.map_err(girok_db::DbError::from)?;

            self.invalidate_status(&consent.account_id, &consent.document_id)
                .await;
            outcome.expired += 1;
        }

        info!(
            notices = outcome.expiring_soon_notices,
            expired = outcome.expired,
            "consent sweep complete"
        );
        Ok(outcome)
    }

    async fn invalidate_status(&self, account_id: &Uuid, document_id: &Uuid) {
        let key = CacheKeys::consent_status(account_id, document_id);
        if let Err(e) = self.cache.delete(&key).await {
            debug!(error = %e, "consent status cache invalidation failed");
        }
    }
}
