//! Sanction repository

use crate::entities::sanction::{
    ActiveModel, Column, Entity, SanctionStatus as DbStatus, SubjectType as DbSubjectType,
};
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use girok_core::entities::sanction::{Sanction, SanctionStatus, SubjectType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// List filter, assembled from typed fragments only
#[derive(Debug, Clone, Default)]
pub struct SanctionFilter {
    pub subject_id: Option<Uuid>,
    pub subject_type: Option<SubjectType>,
    pub status: Option<SanctionStatus>,
    pub service_id: Option<Uuid>,
    pub page: u64,
    pub limit: u64,
}

impl SanctionFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(subject_id) = self.subject_id {
            condition = condition.add(Column::SubjectId.eq(subject_id));
        }
        if let Some(subject_type) = self.subject_type {
            condition = condition.add(Column::SubjectType.eq(DbSubjectType::from(subject_type)));
        }
        if let Some(status) = self.status {
            condition = condition.add(Column::Status.eq(DbStatus::from(status)));
        }
        if let Some(service_id) = self.service_id {
            condition = condition.add(Column::ServiceId.eq(service_id));
        }
        condition
    }
}

/// Sanction repository
#[derive(Clone)]
pub struct SanctionRepository {
    db: Arc<DatabaseConnection>,
}

impl SanctionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert inside the caller's transaction
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        sanction: Sanction,
    ) -> DbResult<Sanction> {
        let active: ActiveModel = sanction.into();
        let model = active.insert(conn).await.map_err(DbError::from)?;
        info!(sanction_id = %model.id, "sanction created");
        model.into_domain()
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Sanction>> {
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
    ///
    /// The domain layer owns transition legality; this writes the
    /// resulting state.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        sanction: Sanction,
    ) -> DbResult<Sanction> {
        let mut active: ActiveModel = sanction.into();
        active.updated_at = Set(Utc::now());
        let model = active.update(conn).await.map_err(DbError::from)?;
        model.into_domain()
    }

    /// Paginated listing for the operator console
    pub async fn list(&self, filter: &SanctionFilter) -> DbResult<(Vec<Sanction>, u64)> {
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

        let mut sanctions = Vec::with_capacity(models.len());
        for model in models {
            sanctions.push(model.into_domain()?);
        }
        Ok((sanctions, total))
    }

    /// Every ACTIVE sanction of one subject; the caller narrows by
    /// window and scope
    pub async fn active_for_subject(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
    ) -> DbResult<Vec<Sanction>> {
        let models = Entity::find()
            .filter(Column::SubjectId.eq(subject_id))
            .filter(Column::SubjectType.eq(DbSubjectType::from(subject_type)))
            .filter(Column::Status.eq(DbStatus::Active))
            .order_by_asc(Column::StartAt)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        let mut sanctions = Vec::with_capacity(models.len());
        for model in models {
            sanctions.push(model.into_domain()?);
        }
        Ok(sanctions)
    }

    /// Sweep: bulk-expire ACTIVE sanctions whose window has closed
    ///
    /// Expiration is derivable from time plus prior state, so no event
    /// is emitted here.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = Entity::update_many()
            .filter(Column::Status.eq(DbStatus::Active))
            .filter(Column::EndAt.is_not_null())
            .filter(Column::EndAt.lte(now))
            .col_expr(
                Column::Status,
                sea_orm::sea_query::Expr::value(DbStatus::Expired),
            )
            .col_expr(Column::UpdatedAt, sea_orm::sea_query::Expr::value(now))
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_are_permissive() {
        let filter = SanctionFilter::default();
        // An all-true condition with no fragments
        assert!(filter.subject_id.is_none());
        assert!(filter.status.is_none());
    }
}
