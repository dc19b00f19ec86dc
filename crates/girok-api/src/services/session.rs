//! Session service
//!
//! Server-side session lifecycle over the session repository, with the
//! shared cache on the validate hot path. Cookie/token issuance stays
//! in the handlers; this service deals in session records.

use chrono::Utc;
use girok_core::cache::{Cache, CacheKeys, CacheTtl};
use girok_core::entities::session::{Session, SessionContext};
use girok_db::repositories::session::{
    generate_refresh_token, hash_refresh_token, SessionRepository,
};
use sea_orm::ConnectionTrait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::middleware::auth::ClientInfo;
use crate::middleware::error_handler::{ApiError, ApiResult};

/// Session service
#[derive(Clone)]
pub struct SessionService {
    sessions: SessionRepository,
    cache: Cache,
}

impl SessionService {
    pub fn new(sessions: SessionRepository, cache: Cache) -> Self {
        Self { sessions, cache }
    }

    /// Create a session inside the caller's transaction
    ///
    /// Returns the stored session and the one-time plaintext refresh
    /// token; only its digest persists.
    pub async fn create_in_txn<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        context: SessionContext,
        mfa_required: bool,
        mfa_verified: bool,
        client: &ClientInfo,
    ) -> ApiResult<(Session, String)> {
        let refresh_token = generate_refresh_token();
        let mut session = Session::new(
            account_id,
            hash_refresh_token(&refresh_token),
            context,
            mfa_required,
        );
        session.mfa_verified = mfa_verified;
        session.ip_address = client.ip_address.clone();
        session.user_agent = client.user_agent.clone();
        session.device_fingerprint = client.user_agent.as_ref().map(|ua| fingerprint(ua));

        let session = self.sessions.create(conn, session).await?;
        Ok((session, refresh_token))
    }

    /// Validate a session by its opaque ID (the cookie value)
    ///
    /// Reads through the cache; the sliding last-activity write is
    /// throttled to once per minute.
    pub async fn validate(&self, session_id: Uuid) -> ApiResult<Session> {
        let key = CacheKeys::session_token(&session_id);
        let now = Utc::now();

        let cached: Option<Session> = self.cache.get_json(&key).await.unwrap_or_else(|e| {
            debug!(error = %e, "session cache read failed, falling back to store");
            None
        });

        let session = match cached {
            Some(session) => session,
            None => {
                let session = self
                    .sessions
                    .find_by_id(session_id)
                    .await?
                    .ok_or(ApiError::Unauthorized)?;
                if let Err(e) = self
                    .cache
                    .set_json(&key, &session, CacheTtl::SESSION)
                    .await
                {
                    debug!(error = %e, "session cache write failed");
                }
                session
            }
        };

        if session.is_expired(now) {
            return Err(ApiError::Unauthorized);
        }

        if session.activity_write_due(now) {
            self.sessions.touch_activity(session.id, now).await?;
            let mut refreshed = session.clone();
            refreshed.last_activity_at = now;
            if let Err(e) = self
                .cache
                .set_json(&key, &refreshed, CacheTtl::SESSION)
                .await
            {
                debug!(error = %e, "session cache refresh failed");
            }
            return Ok(refreshed);
        }

        Ok(session)
    }

    /// Exchange a refresh token: rotate the stored digest and push the
    /// expiry window forward
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<(Session, String)> {
        let session = self
            .sessions
            .find_by_refresh_hash(&hash_refresh_token(refresh_token))
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if session.is_expired(Utc::now()) {
            return Err(ApiError::Unauthorized);
        }

        let new_token = generate_refresh_token();
        self.sessions
            .rotate_refresh(session.id, &hash_refresh_token(&new_token))
            .await?;
        self.invalidate_cached(session.id).await;

        let rotated = self
            .sessions
            .find_by_id(session.id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        info!(session_id = %rotated.id, "refresh token rotated");
        Ok((rotated, new_token))
    }

    /// Revoke one session; idempotent
    pub async fn revoke(&self, session_id: Uuid) -> ApiResult<bool> {
        let existed = self.sessions.delete(session_id).await?;
        self.invalidate_cached(session_id).await;
        Ok(existed)
    }

    /// Revoke every other session of an account inside the caller's
    /// transaction
    ///
    /// Cache entries for the dropped sessions age out within the
    /// session TTL; revocation correctness rests on the store.
    pub async fn revoke_all_except_in_txn<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
        keep: Option<Uuid>,
    ) -> ApiResult<u64> {
        let revoked = self
            .sessions
            .delete_all_except(conn, account_id, keep)
            .await?;
        Ok(revoked)
    }

    /// Mark the session's second factor satisfied inside the caller's
    /// transaction
    pub async fn set_mfa_verified_in_txn<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: Uuid,
    ) -> ApiResult<()> {
        self.sessions.set_mfa_verified(conn, session_id).await?;
        self.invalidate_cached(session_id).await;
        Ok(())
    }

    /// Sessions of one account, most recently active first
    pub async fn list_for_account(&self, account_id: Uuid) -> ApiResult<Vec<Session>> {
        Ok(self.sessions.list_for_account(account_id).await?)
    }

    async fn invalidate_cached(&self, session_id: Uuid) {
        let key = CacheKeys::session_token(&session_id);
        if let Err(e) = self.cache.delete(&key).await {
            debug!(error = %e, "session cache invalidation failed");
        }
    }
}

/// Coarse device fingerprint derived from the user agent
fn fingerprint(user_agent: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(user_agent.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64)";
        assert_eq!(fingerprint(ua), fingerprint(ua));
        assert_eq!(fingerprint(ua).len(), 16);
        assert_ne!(fingerprint(ua), fingerprint("other"));
    }
}
