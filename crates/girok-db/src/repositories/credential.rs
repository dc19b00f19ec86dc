//! Credential repository

use crate::entities::credential::{ActiveModel, Column, Entity, Model};
use crate::error::{DbError, DbResult};
use chrono::Utc;
use girok_core::ids::uuid7;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// Credential repository
#[derive(Clone)]
pub struct CredentialRepository {
    db: Arc<DatabaseConnection>,
}

impl CredentialRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store the credential for a new account inside the caller's
    /// transaction
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        password_hash: String,
    ) -> DbResult<Model> {
        let row = ActiveModel {
            id: Set(uuid7::generate()),
            account_id: Set(account_id),
            password_hash: Set(password_hash),
            updated_at: Set(Utc::now()),
        };

        row.insert(conn).await.map_err(DbError::from)
    }

    pub async fn find_by_account(&self, account_id: Uuid) -> DbResult<Option<Model>> {
        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
    }

    /// Replace the stored hash, re-keyed with current KDF parameters
    pub async fn update_hash<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        password_hash: String,
    ) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::AccountId.eq(account_id))
            .col_expr(
                Column::PasswordHash,
                sea_orm::sea_query::Expr::value(password_hash),
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
}
