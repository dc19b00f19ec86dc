//! Account repository

use crate::entities::account::{ActiveModel, Column, Entity};
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use girok_core::entities::account::Account;
use girok_core::ids::external::{ExternalId, MAX_COLLISION_RETRIES};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new account inside the caller's transaction
    ///
    /// External IDs carry two random characters, so collisions are
    /// possible; the ID is re-generated and re-checked up to three
    /// times before giving up.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        mut account: Account,
    ) -> DbResult<Account> {
        for attempt in 0..=MAX_COLLISION_RETRIES {
            let exists = Entity::find()
                .filter(Column::ExternalId.eq(account.external_id.clone()))
                .one(conn)
                .await
                .map_err(DbError::from)?
                .is_some();

            if !exists {
                break;
            }
            if attempt == MAX_COLLISION_RETRIES {
                return Err(DbError::ConstraintViolation(
                    "external ID collision retries exhausted".to_string(),
                ));
            }
            warn!(attempt, "external ID collision, regenerating");
            account.external_id = ExternalId::generate().into_string();
        }

        let active: ActiveModel = account.into();
        let model = active.insert(conn).await.map_err(|e| {
            let err = DbError::from(e);
            if let DbError::Query(msg) = &err {
                if msg.contains("duplicate") || msg.contains("unique") {
                    return DbError::ConstraintViolation(msg.clone());
                }
            }
            err
        })?;

        info!(account_id = %model.id, "account created");
        Ok(model.into())
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Account>> {
        Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    /// Case-insensitive email lookup; stored emails are lower-cased
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        Entity::find()
            .filter(Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    pub async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<Account>> {
        Entity::find()
            .filter(Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    /// Flip the MFA flag inside the caller's transaction
    pub async fn set_mfa_enabled<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        enabled: bool,
    ) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(Column::MfaEnabled, sea_orm::sea_query::Expr::value(enabled))
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .exec(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Set or clear the rolling-failure lock window
    pub async fn set_locked_until(
        &self,
        id: Uuid,
        locked_until: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        debug!(account_id = %id, ?locked_until, "updating account lock window");

        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(
                Column::LockedUntil,
                sea_orm::sea_query::Expr::value(locked_until),
            )
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;
        Ok(())
    }
}
