//! DSR request repository, including the append-only audit log

use crate::entities::dsr_request::{
    ActiveModel, Column, DsrStatus as DbStatus, DsrType as DbType, Entity,
};
use crate::entities::dsr_request_log;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Duration, Utc};
use girok_core::entities::dsr::{DsrRequest, DsrStatus, DsrType};
use girok_core::ids::uuid7;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// List filter, assembled from typed fragments only
#[derive(Debug, Clone, Default)]
pub struct DsrFilter {
    pub account_id: Option<Uuid>,
    pub status: Option<DsrStatus>,
    pub request_type: Option<DsrType>,
    pub assigned_to: Option<Uuid>,
    pub page: u64,
    pub limit: u64,
}

impl DsrFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(account_id) = self.account_id {
            condition = condition.add(Column::AccountId.eq(account_id));
        }
        if let Some(status) = self.status {
            condition = condition.add(Column::Status.eq(DbStatus::from(status)));
        }
        if let Some(request_type) = self.request_type {
            condition = condition.add(Column::RequestType.eq(DbType::from(request_type)));
        }
        if let Some(assigned_to) = self.assigned_to {
            condition = condition.add(Column::AssignedTo.eq(assigned_to));
        }
        condition
    }
}

/// Counts reported by the statistics endpoint and the daily summary
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsrStatistics {
    pub pending: u64,
    pub in_progress: u64,
    pub approaching_deadline: u64,
    pub overdue: u64,
}

/// DSR repository
#[derive(Clone)]
pub struct DsrRepository {
    db: Arc<DatabaseConnection>,
}

impl DsrRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert inside the caller's transaction
    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: DsrRequest,
    ) -> DbResult<DsrRequest> {
        let active = ActiveModel::try_from(request)?;
        let model = active.insert(conn).await.map_err(DbError::from)?;
        info!(request_id = %model.id, "DSR request created");
        model.into_domain()
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DsrRequest>> {
        match Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)?
        {
            Some(model) => Ok(Some(model.into_domain()?)),
            None => Ok(None),
        }
    }

    /// Full-row update inside the caller's transaction
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        request: DsrRequest,
    ) -> DbResult<DsrRequest> {
        let mut active = ActiveModel::try_from(request)?;
        active.updated_at = Set(Utc::now());
        let model = active.update(conn).await.map_err(DbError::from)?;
        model.into_domain()
    }

    /// Paginated listing
    pub async fn list(&self, filter: &DsrFilter) -> DbResult<(Vec<DsrRequest>, u64)> {
        let limit = filter.limit.clamp(1, 100);
        let page = filter.page.max(1);

        let paginator = Entity::find()
            .filter(filter.condition())
            .order_by_desc(Column::CreatedAt)
            .paginate(self.db.as_ref(), limit);

        let total = paginator.num_items().await.map_err(DbError::from)?;
        let models = paginator
            .fetch_page(page - 1)
            .await
            .map_err(DbError::from)?;

        let mut requests = Vec::with_capacity(models.len());
        for model in models {
            requests.push(model.into_domain()?);
        }
        Ok((requests, total))
    }

    /// Every request still counting against a deadline
    pub async fn open_requests(&self) -> DbResult<Vec<DsrRequest>> {
        let models = Entity::find()
            .filter(
                Condition::any()
                    .add(Column::Status.eq(DbStatus::Pending))
                    .add(Column::Status.eq(DbStatus::Verified))
                    .add(Column::Status.eq(DbStatus::InProgress)),
            )
            .order_by_asc(Column::Deadline)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        let mut requests = Vec::with_capacity(models.len());
        for model in models {
            requests.push(model.into_domain()?);
        }
        Ok(requests)
    }

    /// Open requests past their effective deadline
    ///
    /// The effective deadline is `extended ?? deadline`; computing it in
    /// process avoids NULL-coalescing SQL on the hot path.
    pub async fn overdue(&self, now: DateTime<Utc>) -> DbResult<Vec<DsrRequest>> {
        let open = self.open_requests().await?;
        Ok(open
            .into_iter()
            .filter(|r| r.effective_deadline() <= now)
            .collect())
    }

    /// Counts for the statistics endpoint and the daily summary
    pub async fn statistics(&self, now: DateTime<Utc>) -> DbResult<DsrStatistics> {
        let open = self.open_requests().await?;

        let mut stats = DsrStatistics::default();
        for request in &open {
            match request.status {
                DsrStatus::Pending => stats.pending += 1,
                DsrStatus::InProgress => stats.in_progress += 1,
                _ => {}
            }
            let deadline = request.effective_deadline();
            if deadline <= now {
                stats.overdue += 1;
            } else if deadline <= now + Duration::days(7) {
                stats.approaching_deadline += 1;
            }
        }
        Ok(stats)
    }

    /// Append an audit-log row inside the caller's transaction
    pub async fn append_log<C: ConnectionTrait>(
        &self,
        conn: &C,
        request_id: Uuid,
        action: &str,
        operator_id: Option<Uuid>,
        details: serde_json::Value,
        ip_address: Option<String>,
    ) -> DbResult<()> {
        let row = dsr_request_log::ActiveModel {
            id: Set(uuid7::generate()),
            request_id: Set(request_id),
            action: Set(action.to_string()),
            operator_id: Set(operator_id),
            details: Set(details),
            ip_address: Set(ip_address),
            created_at: Set(Utc::now()),
        };

        row.insert(conn).await.map_err(DbError::from)?;
        Ok(())
    }

    /// Audit log for one request, oldest first
    pub async fn logs_for(&self, request_id: Uuid) -> DbResult<Vec<dsr_request_log::Model>> {
        dsr_request_log::Entity::find()
            .filter(dsr_request_log::Column::RequestId.eq(request_id))
            .order_by_asc(dsr_request_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)
    }
}
