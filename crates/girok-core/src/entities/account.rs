//! Account domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{external::ExternalId, uuid7};

/// How the account authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialKind {
    Local,
    OauthGoogle,
    OauthKakao,
    OauthApple,
}

impl CredentialKind {
    /// Whether the account carries a local password credential
    pub fn has_password(&self) -> bool {
        matches!(self, CredentialKind::Local)
    }
}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Locked,
    Dormant,
    Deleted,
}

/// Privilege mode of the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountMode {
    User,
    Admin,
    Operator,
    Service,
}

/// An identity subject
///
/// Accounts are never hard-deleted; erasure flows through the DSR
/// engine and leaves the row anonymized where retention law demands it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub username: String,
    pub credential_kind: CredentialKind,
    pub status: AccountStatus,
    pub mode: AccountMode,
    pub mfa_enabled: bool,
    pub email_verified: bool,
    pub country: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new local-credential account
    ///
    /// Email is normalized to lower case; uniqueness is case-insensitive
    /// at the store.
    pub fn new(email: String, username: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid7::generate(),
            external_id: ExternalId::generate().into_string(),
            email: email.trim().to_lowercase(),
            username,
            credential_kind: CredentialKind::Local,
            status: AccountStatus::Active,
            mode: AccountMode::User,
            mfa_enabled: false,
            email_verified: false,
            country: None,
            locale: None,
            timezone: None,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a login-attempt lock is currently in force
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        if self.status == AccountStatus::Locked {
            return true;
        }
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }

    /// Whether the account may authenticate at all
    pub fn can_authenticate(&self, now: DateTime<Utc>) -> bool {
        self.status == AccountStatus::Active && !self.is_locked(now)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.mode, AccountMode::Operator | AccountMode::Admin)
    }
}

/// Sentinel account ID under which failed attempts for unknown emails
/// are recorded, keeping the attempt log free of email-existence leaks.
pub fn sentinel_account_id() -> Uuid {
    Uuid::nil()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults() {
        let account = Account::new(
            "  Alice@Example.COM ".to_string(),
            "alice".to_string(),
        );

        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.mode, AccountMode::User);
        assert_eq!(account.credential_kind, CredentialKind::Local);
        assert!(!account.mfa_enabled);
        assert!(!account.email_verified);
        assert_eq!(account.external_id.len(), 10);
    }

    #[test]
    fn test_lockout_window() {
        let mut account = Account::new("a@b.c".to_string(), "a".to_string());
        let now = Utc::now();

        assert!(!account.is_locked(now));
        assert!(account.can_authenticate(now));

        account.locked_until = Some(now + chrono::Duration::minutes(15));
        assert!(account.is_locked(now));
        assert!(!account.can_authenticate(now));

        // Past lock windows no longer apply
        account.locked_until = Some(now - chrono::Duration::seconds(1));
        assert!(!account.is_locked(now));
    }

    #[test]
    fn test_locked_status_overrides_window() {
        let mut account = Account::new("a@b.c".to_string(), "a".to_string());
        account.status = AccountStatus::Locked;
        assert!(account.is_locked(Utc::now()));
    }

    #[test]
    fn test_operator_modes() {
        let mut account = Account::new("op@b.c".to_string(), "op".to_string());
        assert!(!account.is_operator());
        account.mode = AccountMode::Operator;
        assert!(account.is_operator());
        account.mode = AccountMode::Admin;
        assert!(account.is_operator());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&AccountStatus::Active).unwrap(),
            "\"ACTIVE\""
        );
        assert_eq!(
            serde_json::to_string(&CredentialKind::OauthGoogle).unwrap(),
            "\"OAUTH_GOOGLE\""
        );
    }
}
