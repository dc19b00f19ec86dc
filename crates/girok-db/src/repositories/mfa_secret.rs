//! MFA secret repository

use crate::entities::mfa_secret::{ActiveModel, Column, Entity, Model};
use crate::error::{DbError, DbResult};
use chrono::Utc;
use girok_core::ids::uuid7;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// MFA secret repository
#[derive(Clone)]
pub struct MfaSecretRepository {
    db: Arc<DatabaseConnection>,
}

impl MfaSecretRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a freshly provisioned (not yet enabled) secret
    ///
    /// Re-running setup before verification replaces the previous
    /// provisioned secret and codes wholesale.
    pub async fn provision(
        &self,
        account_id: Uuid,
        secret: String,
        backup_code_hashes: Vec<String>,
    ) -> DbResult<Model> {
        // Drop any prior provisioned-or-enabled row first
        Entity::delete_many()
            .filter(Column::AccountId.eq(account_id))
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        let now = Utc::now();
        let row = ActiveModel {
            id: Set(uuid7::generate()),
            account_id: Set(account_id),
            secret: Set(secret),
            backup_code_hashes: Set(serde_json::json!(backup_code_hashes)),
            enabled: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        row.insert(self.db.as_ref()).await.map_err(DbError::from)
    }

    pub async fn find_by_account(&self, account_id: Uuid) -> DbResult<Option<Model>> {
        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
    }

    /// Mark the provisioned secret enabled inside the caller's
    /// transaction
    pub async fn enable<C: ConnectionTrait>(&self, conn: &C, account_id: Uuid) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::AccountId.eq(account_id))
            .col_expr(Column::Enabled, sea_orm::sea_query::Expr::value(true))
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .exec(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Swap the entire backup-code set atomically
    pub async fn replace_backup_codes<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        backup_code_hashes: Vec<String>,
    ) -> DbResult<()> {
        debug!(account_id = %account_id, "rotating backup codes");

        Entity::update_many()
            .filter(Column::AccountId.eq(account_id))
            .col_expr(
                Column::BackupCodeHashes,
                sea_orm::sea_query::Expr::value(serde_json::json!(backup_code_hashes)),
            )
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .exec(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Destroy the secret and codes inside the caller's transaction
    pub async fn delete<C: ConnectionTrait>(&self, conn: &C, account_id: Uuid) -> DbResult<()> {
        Entity::delete_many()
            .filter(Column::AccountId.eq(account_id))
            .exec(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }
}
