//! Consent repository

use crate::entities::consent::{ActiveModel, Column, ConsentStatus as DbStatus, Entity};
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use girok_core::entities::consent::{Consent, ConsentStatus};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Consent repository
#[derive(Clone)]
pub struct ConsentRepository {
    db: Arc<DatabaseConnection>,
}

impl ConsentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert inside the caller's transaction
    pub async fn insert<C: ConnectionTrait>(&self, conn: &C, consent: Consent) -> DbResult<Consent> {
        let active: ActiveModel = consent.into();
        let model = active.insert(conn).await.map_err(DbError::from)?;
        info!(consent_id = %model.id, account_id = %model.account_id, "consent recorded");
        Ok(model.into())
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Consent>> {
        Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    /// The single GRANTED consent for `(account, document)`, if any
    pub async fn find_granted(
        &self,
        account_id: Uuid,
        document_id: Uuid,
    ) -> DbResult<Option<Consent>> {
        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::DocumentId.eq(document_id))
            .filter(Column::Status.eq(DbStatus::Granted))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    pub async fn list_for_account(&self, account_id: Uuid) -> DbResult<Vec<Consent>> {
        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .order_by_desc(Column::GrantedAt)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|models| models.into_iter().map(Into::into).collect())
    }

    /// Write a terminal status inside the caller's transaction
    pub async fn set_status<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        status: ConsentStatus,
        withdrawn_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(
                Column::Status,
                sea_orm::sea_query::Expr::value(DbStatus::from(status)),
            )
            .col_expr(
                Column::WithdrawnAt,
                sea_orm::sea_query::Expr::value(withdrawn_at),
            )
            .exec(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// GRANTED consents expiring within `(from, to]`, for the
    /// expiring-soon notice
    pub async fn expiring_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Consent>> {
        Entity::find()
            .filter(Column::Status.eq(DbStatus::Granted))
            .filter(Column::ExpiresAt.is_not_null())
            .filter(Column::ExpiresAt.gt(from))
            .filter(Column::ExpiresAt.lte(to))
            .order_by_asc(Column::ExpiresAt)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|models| models.into_iter().map(Into::into).collect())
    }

    /// GRANTED consents whose expiry instant has passed
    pub async fn expired_due(&self, now: DateTime<Utc>) -> DbResult<Vec<Consent>> {
        Entity::find()
            .filter(Column::Status.eq(DbStatus::Granted))
            .filter(Column::ExpiresAt.is_not_null())
            .filter(Column::ExpiresAt.lte(now))
            .order_by_asc(Column::ExpiresAt)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|models| models.into_iter().map(Into::into).collect())
    }
}
