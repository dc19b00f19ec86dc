//! Login attempt repository
//!
//! Append-only; the rolling failure count drives the lockout decision
//! in the auth service.

use crate::entities::login_attempt::{ActiveModel, Column, Entity, Model};
use crate::error::{DbError, DbResult};
use chrono::{Duration, Utc};
use girok_core::ids::uuid7;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// Login attempt repository
#[derive(Clone)]
pub struct LoginAttemptRepository {
    db: Arc<DatabaseConnection>,
}

impl LoginAttemptRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record one attempt
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        account_id: Uuid,
        email: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
        success: bool,
        failure_reason: Option<String>,
    ) -> DbResult<Model> {
        let row = ActiveModel {
            id: Set(uuid7::generate()),
            account_id: Set(account_id),
            email: Set(email.to_string()),
            ip_address: Set(ip_address),
            user_agent: Set(user_agent),
            success: Set(success),
            failure_reason: Set(failure_reason),
            created_at: Set(Utc::now()),
        };

        row.insert(self.db.as_ref()).await.map_err(DbError::from)
    }

    /// Failed attempts for an account within the rolling window
    pub async fn rolling_failures(
        &self,
        account_id: Uuid,
        window: Duration,
    ) -> DbResult<u64> {
        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::Success.eq(false))
            .filter(Column::CreatedAt.gt(Utc::now() - window))
            .count(self.db.as_ref())
            .await
            .map_err(DbError::from)
    }
}
