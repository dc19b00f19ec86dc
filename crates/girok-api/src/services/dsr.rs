//! DSR service
//!
//! The request state machine, deadline bookkeeping, escalation sweep,
//! daily summary, and the append-only audit log. Every state-changing
//! operation writes the row, a log entry, and exactly one outbox event
//! in one transaction.

use chrono::{DateTime, Utc};
use girok_core::cache::{Cache, CacheKeys, CacheTtl};
use girok_core::entities::dsr::{
    DsrPriority, DsrRequest, DsrResponseType, DsrScope, DsrStatus, DsrType, LegalBasis,
};
use girok_core::events::{AggregateType, DsrDeadlinePayload, EventType, DSR_DAILY_SUMMARY_TOPIC};
use girok_db::entities::dsr_request_log;
use girok_db::repositories::{DsrFilter, DsrRepository, DsrStatistics, NewOutboxEvent, OutboxRepository};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::middleware::error_handler::{ApiError, ApiResult};

/// Operator processing actions on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessAction {
    /// VERIFIED -> IN_PROGRESS
    Start,
    /// IN_PROGRESS -> AWAITING_INFO
    AwaitInfo,
    /// AWAITING_INFO -> IN_PROGRESS
    Resume,
    /// IN_PROGRESS -> COMPLETED
    Complete,
    /// -> REJECTED
    Reject,
}

/// Context recorded in the audit log for an operation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    pub operator_id: Option<Uuid>,
    pub ip_address: Option<String>,
}

/// Counts from one escalation sweep run
#[derive(Debug, Default, Clone, Copy)]
pub struct EscalationSweepOutcome {
    pub escalated: u64,
}

/// DSR service
#[derive(Clone)]
pub struct DsrService {
    db: Arc<DatabaseConnection>,
    requests: DsrRepository,
    outbox: OutboxRepository,
    cache: Cache,
}

impl DsrService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        requests: DsrRepository,
        outbox: OutboxRepository,
        cache: Cache,
    ) -> Self {
        Self {
            db,
            requests,
            outbox,
            cache,
        }
    }

    /// Submit a request; the deadline derives from the legal basis
    pub async fn submit(
        &self,
        account_id: Uuid,
        request_type: DsrType,
        legal_basis: LegalBasis,
        scope: DsrScope,
        priority: DsrPriority,
        ctx: &OperationContext,
    ) -> ApiResult<DsrRequest> {
        let request = DsrRequest::submit(account_id, request_type, legal_basis, scope, priority);

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let request = self.requests.insert(&txn, request).await?;
        self.requests
            .append_log(
                &txn,
                request.id,
                "SUBMIT",
                ctx.operator_id,
                json!({
                    "requestType": request.request_type,
                    "legalBasis": request.legal_basis,
                    "deadline": request.deadline,
                }),
                ctx.ip_address.clone(),
            )
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::DsrRequest,
                    request.id,
                    EventType::DsrSubmitted,
                    json!({
                        "requestId": request.id,
                        "accountId": account_id,
                        "requestType": request.request_type,
                        "deadline": request.deadline,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        info!(request_id = %request.id, "DSR submitted");
        Ok(request)
    }

    /// One request, read through the cache
    pub async fn get(&self, id: Uuid) -> ApiResult<DsrRequest> {
        let key = CacheKeys::dsr_id(&id);
        let requests = self.requests.clone();

        let request: Option<DsrRequest> = self
            .cache
            .get_or_compute(&key, CacheTtl::USER_DATA, || async move {
                requests
                    .find_by_id(id)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))
            })
            .await?;

        request.ok_or_else(|| ApiError::NotFound("DSR request".to_string()))
    }

    pub async fn list(&self, filter: &DsrFilter) -> ApiResult<(Vec<DsrRequest>, u64)> {
        Ok(self.requests.list(filter).await?)
    }

    pub async fn logs(&self, id: Uuid) -> ApiResult<Vec<dsr_request_log::Model>> {
        // 404 for logs of a request that does not exist
        self.get(id).await?;
        Ok(self.requests.logs_for(id).await?)
    }

    /// PENDING -> VERIFIED
    pub async fn verify(&self, id: Uuid, ctx: &OperationContext) -> ApiResult<DsrRequest> {
        self.apply_transition(id, DsrStatus::Verified, "VERIFY", json!({}), ctx)
            .await
    }

    /// Operator processing step
    pub async fn process(
        &self,
        id: Uuid,
        action: ProcessAction,
        response_type: Option<DsrResponseType>,
        response_body: Option<String>,
        note: Option<String>,
        ctx: &OperationContext,
    ) -> ApiResult<DsrRequest> {
        let (target, action_name) = match action {
            ProcessAction::Start => (DsrStatus::InProgress, "START"),
            ProcessAction::AwaitInfo => (DsrStatus::AwaitingInfo, "AWAIT_INFO"),
            ProcessAction::Resume => (DsrStatus::InProgress, "RESUME"),
            ProcessAction::Complete => (DsrStatus::Completed, "COMPLETE"),
            ProcessAction::Reject => (DsrStatus::Rejected, "REJECT"),
        };

        let mut request = self.load_for_update(id).await?;
        request.transition(target)?;
        request.processed_by = ctx.operator_id.or(request.processed_by);
        if action == ProcessAction::Complete {
            request.response_type = response_type;
            request.response_body = response_body.clone();
        }
        if note.is_some() {
            request.response_note = note.clone();
        }

        self.persist_transition(
            request,
            action_name,
            json!({
                "status": target,
                "note": note,
            }),
            ctx,
        )
        .await
    }

    /// Subject-side cancellation (DELETE /dsr-requests/:id)
    pub async fn cancel(&self, id: Uuid, ctx: &OperationContext) -> ApiResult<DsrRequest> {
        self.apply_transition(id, DsrStatus::Cancelled, "CANCEL", json!({}), ctx)
            .await
    }

    /// One regulator-permitted deadline extension, reason required
    pub async fn extend_deadline(
        &self,
        id: Uuid,
        new_deadline: DateTime<Utc>,
        reason: String,
        ctx: &OperationContext,
    ) -> ApiResult<DsrRequest> {
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "an extension requires a reason".to_string(),
            ));
        }

        let mut request = self.load_for_update(id).await?;
        request.ensure_extendable(new_deadline)?;
        request.extended_deadline = Some(new_deadline);
        request.extension_reason = Some(reason.clone());

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let request = self.requests.update(&txn, request).await?;
        self.requests
            .append_log(
                &txn,
                request.id,
                "EXTEND_DEADLINE",
                ctx.operator_id,
                json!({ "newDeadline": new_deadline, "reason": reason }),
                ctx.ip_address.clone(),
            )
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::DsrRequest,
                    request.id,
                    EventType::DsrDeadlineExtended,
                    json!({
                        "requestId": request.id,
                        "newDeadline": new_deadline,
                        "reason": reason,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_cached(request.id).await;
        Ok(request)
    }

    /// Assign the request to an operator
    pub async fn assign(
        &self,
        id: Uuid,
        assignee: Uuid,
        ctx: &OperationContext,
    ) -> ApiResult<DsrRequest> {
        let mut request = self.load_for_update(id).await?;
        if request.status.is_terminal() {
            return Err(ApiError::Precondition(
                "closed requests cannot be assigned".to_string(),
            ));
        }
        request.assigned_to = Some(assignee);

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let request = self.requests.update(&txn, request).await?;
        self.requests
            .append_log(
                &txn,
                request.id,
                "ASSIGN",
                ctx.operator_id,
                json!({ "assignee": assignee }),
                ctx.ip_address.clone(),
            )
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::DsrRequest,
                    request.id,
                    EventType::DsrAssigned,
                    json!({ "requestId": request.id, "assignee": assignee }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_cached(request.id).await;
        Ok(request)
    }

    pub async fn statistics(&self) -> ApiResult<DsrStatistics> {
        Ok(self.requests.statistics(Utc::now()).await?)
    }

    pub async fn overdue(&self) -> ApiResult<Vec<DsrRequest>> {
        Ok(self.requests.overdue(Utc::now()).await?)
    }

    /// Hourly escalation sweep
    ///
    /// Applies the remaining-time tier to every open request. Levels
    /// are monotonic; each raise writes the level, `escalated_at`, and
    /// its deadline event in one transaction per row.
    pub async fn escalation_sweep(&self, now: DateTime<Utc>) -> ApiResult<EscalationSweepOutcome> {
        let open = self.requests.open_requests().await?;
        let mut outcome = EscalationSweepOutcome::default();

        for mut request in open {
            let level = request.escalation_for(now);
            if level <= request.escalation_level {
                continue;
            }
            let Some(event_type) = level.event_type() else {
                continue;
            };

            request.escalation_level = level;
            request.escalated_at = Some(now);

            let payload = DsrDeadlinePayload {
                request_id: request.id,
                account_id: request.account_id,
                escalation_level: level.as_str().to_string(),
                effective_deadline: request.effective_deadline(),
                remaining_hours: (request.effective_deadline() - now).num_hours(),
            };

            let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
            let request = self.requests.update(&txn, request).await?;
            self.outbox
                .append(
                    &txn,
                    NewOutboxEvent::new(
                        AggregateType::DsrRequest,
                        request.id,
                        event_type,
                        serde_json::to_value(&payload)
                            .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                )
                .await?;
            txn.commit().await.map_err(girok_db::DbError::from)?;

            self.invalidate_cached(request.id).await;
            outcome.escalated += 1;
        }

        if outcome.escalated > 0 {
            info!(escalated = outcome.escalated, "DSR escalation sweep raised levels");
        }
        Ok(outcome)
    }

    /// Daily 08:00 UTC summary; observational, emitted via the outbox
    /// under a nil aggregate ID
    pub async fn daily_summary(&self, now: DateTime<Utc>) -> ApiResult<DsrStatistics> {
        let stats = self.requests.statistics(now).await?;

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::custom(
                    AggregateType::DsrRequest,
                    Uuid::nil(),
                    DSR_DAILY_SUMMARY_TOPIC,
                    json!({
                        "date": now.format("%Y-%m-%d").to_string(),
                        "pending": stats.pending,
                        "inProgress": stats.in_progress,
                        "approachingDeadline": stats.approaching_deadline,
                        "overdue": stats.overdue,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        info!(
            pending = stats.pending,
            in_progress = stats.in_progress,
            approaching = stats.approaching_deadline,
            overdue = stats.overdue,
            "DSR daily summary emitted"
        );
        Ok(stats)
    }

    // Internal helpers

    async fn load_for_update(&self, id: Uuid) -> ApiResult<DsrRequest> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("DSR request".to_string()))
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        target: DsrStatus,
        action: &str,
        details: serde_json::Value,
        ctx: &OperationContext,
    ) -> ApiResult<DsrRequest> {
        let mut request = self.load_for_update(id).await?;
        request.transition(target)?;
        self.persist_transition(request, action, details, ctx).await
    }

    /// Write the row, the audit-log entry, and one `DSR_STATUS_CHANGED`
    /// event in a single transaction
    async fn persist_transition(
        &self,
        request: DsrRequest,
        action: &str,
        mut details: serde_json::Value,
        ctx: &OperationContext,
    ) -> ApiResult<DsrRequest> {
        if let Some(object) = details.as_object_mut() {
            object.insert("action".to_string(), json!(action));
        }

        let txn = self.db.begin().await.map_err(girok_db::DbError::from)?;
        let request = self.requests.update(&txn, request).await?;
        self.requests
            .append_log(
                &txn,
                request.id,
                action,
                ctx.operator_id,
                details,
                ctx.ip_address.clone(),
            )
            .await?;
        self.outbox
            .append(
                &txn,
                NewOutboxEvent::new(
                    AggregateType::DsrRequest,
                    request.id,
                    EventType::DsrStatusChanged,
                    json!({
                        "requestId": request.id,
                        "status": request.status,
                        "action": action,
                    }),
                ),
            )
            .await?;
        txn.commit().await.map_err(girok_db::DbError::from)?;

        self.invalidate_cached(request.id).await;
        info!(request_id = %request.id, status = request.status.as_str(), "DSR transition");
        Ok(request)
    }

    async fn invalidate_cached(&self, id: Uuid) {
        if let Err(e) = self.cache.delete(&CacheKeys::dsr_id(&id)).await {
            debug!(error = %e, "DSR cache invalidation failed");
        }
    }
}
