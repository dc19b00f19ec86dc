//! Session domain entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::uuid7;

/// Refresh-token lifetime
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 14;

/// Access-token lifetime
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Minimum gap between sliding last-activity writes
pub const ACTIVITY_WRITE_INTERVAL_SECS: i64 = 60;

/// Edge session cookie name
pub const SESSION_COOKIE: &str = "girok_session";

/// Edge session cookie Max-Age (14 days, matches the refresh lifetime)
pub const SESSION_COOKIE_MAX_AGE_SECS: i64 = 1_209_600;

/// Whether the session belongs to an end user or an operator console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionContext {
    User,
    Operator,
}

/// A server-side session record
///
/// The refresh token itself never persists; only its SHA-256 digest
/// does. The edge cookie carries the session ID, not the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub account_id: Uuid,
    pub refresh_token_hash: String,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub context: SessionContext,
    pub mfa_verified: bool,
    pub mfa_required: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for an account
    pub fn new(
        account_id: Uuid,
        refresh_token_hash: String,
        context: SessionContext,
        mfa_required: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid7::generate(),
            account_id,
            refresh_token_hash,
            device_fingerprint: None,
            ip_address: None,
            user_agent: None,
            context,
            mfa_verified: false,
            mfa_required,
            created_at: now,
            last_activity_at: now,
            expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session satisfies its own MFA requirement
    pub fn is_fully_authenticated(&self) -> bool {
        !self.mfa_required || self.mfa_verified
    }

    /// Whether a sliding-activity write is due, throttled to avoid
    /// write amplification on hot sessions
    pub fn activity_write_due(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity_at >= Duration::seconds(ACTIVITY_WRITE_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            Uuid::new_v4(),
            "deadbeef".repeat(8),
            SessionContext::User,
            false,
        )
    }

    #[test]
    fn test_new_session_window() {
        let s = session();
        let now = Utc::now();

        assert!(!s.is_expired(now));
        assert!(s.is_expired(now + Duration::days(REFRESH_TOKEN_TTL_DAYS)));
    }

    #[test]
    fn test_mfa_gate() {
        let mut s = session();
        assert!(s.is_fully_authenticated());

        s.mfa_required = true;
        assert!(!s.is_fully_authenticated());

        s.mfa_verified = true;
        assert!(s.is_fully_authenticated());
    }

    #[test]
    fn test_activity_write_throttle() {
        let mut s = session();
        let now = Utc::now();

        s.last_activity_at = now;
        assert!(!s.activity_write_due(now + Duration::seconds(30)));
        assert!(s.activity_write_due(now + Duration::seconds(61)));
    }

    #[test]
    fn test_cookie_constants() {
        assert_eq!(SESSION_COOKIE, "girok_session");
        assert_eq!(SESSION_COOKIE_MAX_AGE_SECS, 1_209_600);
    }
}
