//! Session repository
//!
//! Server-side session records. Refresh tokens exist only as SHA-256
//! digests; the helpers here generate the opaque token and hash it.

use crate::entities::session::{ActiveModel, Column, Entity};
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Duration, Utc};
use girok_core::entities::session::{Session, REFRESH_TOKEN_TTL_DAYS};
use rand::{rngs::OsRng, RngCore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Generate an opaque 32-byte refresh token, hex-encoded
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(64);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// SHA-256 digest of a refresh token, hex-encoded
pub fn hash_refresh_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Session repository
#[derive(Clone)]
pub struct SessionRepository {
    db: Arc<DatabaseConnection>,
}

impl SessionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a session inside the caller's transaction
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        session: Session,
    ) -> DbResult<Session> {
        let active: ActiveModel = session.into();
        let model = active.insert(conn).await.map_err(DbError::from)?;
        info!(session_id = %model.id, account_id = %model.account_id, "session created");
        Ok(model.into())
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<Session>> {
        Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    pub async fn find_by_refresh_hash(&self, token_hash: &str) -> DbResult<Option<Session>> {
        Entity::find()
            .filter(Column::RefreshTokenHash.eq(token_hash))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|model| model.map(Into::into))
    }

    pub async fn list_for_account(&self, account_id: Uuid) -> DbResult<Vec<Session>> {
        Entity::find()
            .filter(Column::AccountId.eq(account_id))
            .filter(Column::ExpiresAt.gt(Utc::now()))
            .order_by_desc(Column::LastActivityAt)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)
            .map(|models| models.into_iter().map(Into::into).collect())
    }

    /// Sliding-activity write; throttling is the caller's decision
    pub async fn touch_activity(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(
                Column::LastActivityAt,
                sea_orm::sea_query::Expr::value(at),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Mark the session's second factor satisfied inside the caller's
    /// transaction
    pub async fn set_mfa_verified<C: ConnectionTrait>(&self, conn: &C, id: Uuid) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(Column::MfaVerified, sea_orm::sea_query::Expr::value(true))
            .exec(conn)
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Rotate the refresh token and push the expiry window forward
    pub async fn rotate_refresh(&self, id: Uuid, new_token_hash: &str) -> DbResult<()> {
        Entity::update_many()
            .filter(Column::Id.eq(id))
            .col_expr(
                Column::RefreshTokenHash,
                sea_orm::sea_query::Expr::value(new_token_hash),
            )
            .col_expr(
                Column::ExpiresAt,
                sea_orm::sea_query::Expr::value(
                    Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS),
                ),
            )
            .col_expr(
                Column::LastActivityAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;
        Ok(())
    }

    /// Delete one session; true when a row existed
    pub async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(DbError::from)?;
        Ok(result.rows_affected > 0)
    }

    /// Bulk-revoke every other session of an account, inside the
    /// caller's transaction
    pub async fn delete_all_except<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        keep: Option<Uuid>,
    ) -> DbResult<u64> {
        let mut query = Entity::delete_many().filter(Column::AccountId.eq(account_id));
        if let Some(keep_id) = keep {
            query = query.filter(Column::Id.ne(keep_id));
        }

        let result = query.exec(conn).await.map_err(DbError::from)?;
        info!(account_id = %account_id, revoked = result.rows_affected, "bulk session revocation");
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_token_shape() {
        let token = generate_refresh_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, generate_refresh_token());
    }

    #[test]
    fn test_hash_is_deterministic_and_distinct() {
        let token = generate_refresh_token();
        assert_eq!(hash_refresh_token(&token), hash_refresh_token(&token));
        assert_ne!(hash_refresh_token(&token), token);
        assert_eq!(hash_refresh_token(&token).len(), 64);
    }
}
