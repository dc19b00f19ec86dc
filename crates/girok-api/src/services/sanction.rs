//! Sanction service
//!
//! Lifecycle and appeal operations over the sanction repository. Each
//! mutation commits with its outbox event in one transaction; the
//! active-set read feeds moderation checks and is cached briefly.

use chrono::{DateTime, Utc};
use girok_core::cache::{Cache, CacheTtl, KEY_PREFIX};
use girok_core::entities::sanction::{
    ActiveSanctions, Appeal, AppealStatus, Sanction, SanctionStatus, SubjectType,
};
use girok_core::events::{AggregateType, EventType};
use girok_db::repositories::{NewOutboxEvent, OutboxRepository, SanctionFilter, SanctionRepository};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::middleware::error_handler::{ApiError, ApiResult};

fn active_set_key(subject_id: &Uuid) -> String {
    format!("{KEY_PREFIX}:sanction:active:{subject_id}")
}

/// Input for sanction creation
#[derive(Debug, Clone)]
pub struct CreateSanction {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub service_id: Option<Uuid>,
    pub sanction_type: girok_core::entities::sanction::SanctionType,
    pub severity: girok_core::entities::sanction::SanctionSeverity,
    pub restricted_features: Vec<String>,
    pub reason: String,
    pub internal_note: Option<String>,
    pub evidence_urls: Vec<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Sanction service
#[derive(Clone)]
pub struct SanctionService {
    db: Arc<DatabaseConnection>,
    sanctions: SanctionRepository,
    outbox: OutboxRepository,
    cache: Cache,
}

impl SanctionService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sanctions: SanctionRepository,
        outbox: OutboxRepository,
        cache: Cache,
    ) -> Self {
        Self {
            db,
            sanctions,
            outbox,
            cache,
        }
    }

    /// Apply a sanction; emits `SANCTION_APPLIED`
    pub async fn create(&self, input: CreateSanction, operator_id: Uuid) -> ApiResult<Sanction> {
        let mut sanction = Sanction::new(
            input.subject_id,
            input.subject_type,
            input.service_id,
            input.sanction_type,
            input.severity,
            input.reason,
            operator_id,
            SubjectType::Operator,
            input.start_at.unwrap_or_else(Utc::now),
            input.end_at,
        )?;
        sanction.restricted_features = input.restricted_features;
        sanction.internal_note = input.internal_note;
        sanction.evidence_urls = input.evidence_urls;

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let sanction = self.sanctions.create(&txn, sanction).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Sanction,
                    sanction.id,
                    EventType::SanctionApplied,
                    json!({
                        "sanctionId": sanction.id,
                        "subjectId": sanction.subject_id,
                        "subjectType": sanction.subject_type,
                        "sanctionType": sanction.sanction_type,
                        "endAt": sanction.end_at,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_active_set(&sanction.subject_id).await;
        info!(sanction_id = %sanction.id, subject_id = %sanction.subject_id, "sanction applied");
        Ok(sanction)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<Sanction> {
        self.sanctions
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("sanction".to_string()))
    }

    pub async fn list(&self, filter: &SanctionFilter) -> ApiResult<(Vec<Sanction>, u64)> {
        Ok(self.sanctions.list(filter).await?)
    }

    /// Operator revocation: `ACTIVE -> REVOKED`
    pub async fn revoke(&self, id: Uuid, operator_id: Uuid, reason: String) -> ApiResult<Sanction> {
        let mut sanction = self.get(id).await?;
        sanction.ensure_revocable()?;

        sanction.status = SanctionStatus::Revoked;
        sanction.revoked_by = Some(operator_id);
        sanction.revoke_reason = Some(reason.clone());

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let sanction = self.sanctions.update(&txn, sanction).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Sanction,
                    sanction.id,
                    EventType::SanctionRevoked,
                    json!({
                        "sanctionId": sanction.id,
                        "subjectId": sanction.subject_id,
                        "revokedBy": operator_id,
                        "reason": reason,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_active_set(&sanction.subject_id).await;
        info!(sanction_id = %sanction.id, "sanction revoked");
        Ok(sanction)
    }

    /// Push the end of an active sanction's window outward
    pub async fn extend(
        &self,
        id: Uuid,
        operator_id: Uuid,
        new_end_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> ApiResult<Sanction> {
        self.amend(id, operator_id, new_end_at, reason, true).await
    }

    /// Pull the end of an active sanction's window inward
    pub async fn reduce(
        &self,
        id: Uuid,
        operator_id: Uuid,
        new_end_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> ApiResult<Sanction> {
        self.amend(id, operator_id, new_end_at, reason, false).await
    }

    async fn amend(
        &self,
        id: Uuid,
        operator_id: Uuid,
        new_end_at: DateTime<Utc>,
        reason: Option<String>,
        extend: bool,
    ) -> ApiResult<Sanction> {
        let mut sanction = self.get(id).await?;
        sanction.ensure_amendable()?;

        let current_end = sanction.end_at.ok_or_else(|| {
            ApiError::Precondition("sanction has no end date to amend".to_string())
        })?;
        if extend && new_end_at <= current_end {
            return Err(ApiError::InvalidInput(
                "extension must move the end date later".to_string(),
            ));
        }
        if !extend && new_end_at >= current_end {
            return Err(ApiError::InvalidInput(
                "reduction must move the end date earlier".to_string(),
            ));
        }
        if new_end_at < sanction.start_at {
            return Err(ApiError::InvalidInput(
                "end date cannot precede the start date".to_string(),
            ));
        }

        sanction.end_at = Some(new_end_at);

        let event_type = if extend {
            EventType::SanctionExtended
        } else {
            EventType::SanctionReduced
        };

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let sanction = self.sanctions.update(&txn, sanction).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Sanction,
                    sanction.id,
                    event_type,
                    json!({
                        "sanctionId": sanction.id,
                        "subjectId": sanction.subject_id,
                        "operatorId": operator_id,
                        "previousEndAt": current_end,
                        "newEndAt": new_end_at,
                        "reason": reason,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_active_set(&sanction.subject_id).await;
        Ok(sanction)
    }

    /// The active-set query for moderation checks, cached briefly
    pub async fn get_active(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
        service_id: Option<Uuid>,
    ) -> ApiResult<ActiveSanctions> {
        let key = active_set_key(&subject_id);
        let sanctions: Vec<Sanction> = match self.cache.get_json(&key).await {
            Ok(Some(cached)) => cached,
            Ok(None) | Err(_) => {
                let fresh = self
                    .sanctions
                    .active_for_subject(subject_id, subject_type)
                    .await?;
                if let Err(e) = self
                    .cache
                    .set_json(&key, &fresh, CacheTtl::SHORT_LIVED)
                    .await
                {
                    debug!(error = %e, "active-set cache write failed");
                }
                fresh
            }
        };

        Ok(ActiveSanctions::collect(sanctions, service_id, Utc::now()))
    }

    /// Subject-initiated appeal; one per sanction
    pub async fn submit_appeal(
        &self,
        id: Uuid,
        subject_id: Uuid,
        reason: String,
        evidence_urls: Vec<String>,
    ) -> ApiResult<Sanction> {
        let mut sanction = self.get(id).await?;
        sanction.ensure_appealable(subject_id)?;

        sanction.appeal = Some(Appeal {
            status: AppealStatus::Pending,
            reason: reason.clone(),
            evidence_urls,
            submitted_at: Utc::now(),
            reviewer_id: None,
            response: None,
            reviewed_at: None,
        });

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let sanction = self.sanctions.update(&txn, sanction).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Sanction,
                    sanction.id,
                    EventType::SanctionAppealSubmitted,
                    json!({
                        "sanctionId": sanction.id,
                        "subjectId": sanction.subject_id,
                        "reason": reason,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        info!(sanction_id = %sanction.id, "appeal submitted");
        Ok(sanction)
    }

    /// Operator takes the appeal under review
    pub async fn begin_appeal_review(&self, id: Uuid, operator_id: Uuid) -> ApiResult<Sanction> {
        let mut sanction = self.get(id).await?;
        let appeal = sanction
            .appeal
            .as_mut()
            .ok_or_else(|| ApiError::Precondition("no appeal to review".to_string()))?;

        if !AppealStatus::can_transition(appeal.status, AppealStatus::UnderReview) {
            return Err(ApiError::Conflict(format!(
                "appeal cannot move from {} to UNDER_REVIEW",
                appeal.status.as_str()
            )));
        }
        appeal.status = AppealStatus::UnderReview;
        appeal.reviewer_id = Some(operator_id);

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let sanction = self.sanctions.update(&txn, sanction).await?;
        // Taking an appeal under review is a workflow step, not a
        // reviewed decision; the event fires on the decision.
        txn.commit().await.map_err(girok_db::DbError::from)?;

        Ok(sanction)
    }

    /// Decide the appeal; APPROVED revokes the sanction atomically with
    /// the decision write and the `SANCTION_APPEAL_REVIEWED` event
    pub async fn decide_appeal(
        &self,
        id: Uuid,
        operator_id: Uuid,
        decision: AppealStatus,
        response: Option<String>,
    ) -> ApiResult<Sanction> {
        if !decision.is_decided() {
            return Err(ApiError::InvalidInput(
                "decision must be APPROVED, REJECTED or ESCALATED".to_string(),
            ));
        }

        let mut sanction = self.get(id).await?;
        let appeal = sanction
            .appeal
            .as_mut()
            .ok_or_else(|| ApiError::Precondition("no appeal to decide".to_string()))?;

        if !AppealStatus::can_transition(appeal.status, decision) {
            return Err(ApiError::Conflict(format!(
                "appeal cannot move from {} to {}",
                appeal.status.as_str(),
                decision.as_str()
            )));
        }

        appeal.status = decision;
        appeal.reviewer_id = Some(operator_id);
        appeal.response = response.clone();
        appeal.reviewed_at = Some(Utc::now());

        if decision == AppealStatus::Approved {
            sanction.ensure_revocable()?;
            sanction.status = SanctionStatus::Revoked;
            sanction.revoked_by = Some(operator_id);
            sanction.revoke_reason = Some("appeal approved".to_string());
        }

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let sanction = self.sanctions.update(&txn, sanction).await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::Sanction,
                    sanction.id,
                    EventType::SanctionAppealReviewed,
                    json!({
                        "sanctionId": sanction.id,
                        "subjectId": sanction.subject_id,
                        "decision": decision,
                        "reviewerId": operator_id,
                        "sanctionStatus": sanction.status,
                        "response": response,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_active_set(&sanction.subject_id).await;
        info!(sanction_id = %sanction.id, decision = decision.as_str(), "appeal decided");
        Ok(sanction)
    }

    /// Sweep hook: bulk-expire sanctions whose window has closed
    ///
    /// Expiration emits no event, being derivable from time and prior
    /// state.
    pub async fn expire_due(&self) -> ApiResult<u64> {
        let expired = self.sanctions.expire_due(Utc::now()).await?;
        Ok(expired)
    }

    async fn invalidate_active_set(&self, subject_id: &Uuid) {
        if let Err(e) = self.cache.delete(&active_set_key(subject_id)).await {
            debug!(error = %e, "active-set cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_set_key_namespace() {
        let id = Uuid::nil();
        assert_eq!(
            active_set_key(&id),
            "girok:sanction:active:00000000-0000-0000-0000-000000000000"
        );
    }
}
