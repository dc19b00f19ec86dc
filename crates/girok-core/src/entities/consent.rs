//! Consent domain entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::uuid7;

/// Days ahead of expiry at which the expiring-soon notice fires
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Consent lifecycle status
///
/// Transitions are monotonic: GRANTED may move to WITHDRAWN or EXPIRED,
/// and both of those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    Granted,
    Withdrawn,
    Expired,
}

impl ConsentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConsentStatus::Withdrawn | ConsentStatus::Expired)
    }

    pub fn can_transition(from: ConsentStatus, to: ConsentStatus) -> bool {
        matches!(
            (from, to),
            (ConsentStatus::Granted, ConsentStatus::Withdrawn)
                | (ConsentStatus::Granted, ConsentStatus::Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Granted => "GRANTED",
            ConsentStatus::Withdrawn => "WITHDRAWN",
            ConsentStatus::Expired => "EXPIRED",
        }
    }
}

/// A per-account consent to one legal document
///
/// At most one non-terminal consent exists per `(account, document)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consent {
    pub id: Uuid,
    pub account_id: Uuid,
    pub document_id: Uuid,
    pub status: ConsentStatus,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl Consent {
    pub fn grant(account_id: Uuid, document_id: Uuid, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: uuid7::generate(),
            account_id,
            document_id,
            status: ConsentStatus::Granted,
            granted_at: Utc::now(),
            expires_at,
            withdrawn_at: None,
        }
    }

    /// Whether the consent is past its expiry instant
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Days until expiry when the consent is inside the expiring-soon
    /// window `(now, now + 30d]`
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        let expires_at = self.expires_at?;
        if expires_at <= now {
            return None;
        }
        let remaining = expires_at - now;
        if remaining > Duration::days(EXPIRING_SOON_DAYS) {
            return None;
        }
        Some(remaining.num_days().max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_monotonicity() {
        assert!(ConsentStatus::can_transition(
            ConsentStatus::Granted,
            ConsentStatus::Withdrawn
        ));
        assert!(ConsentStatus::can_transition(
            ConsentStatus::Granted,
            ConsentStatus::Expired
        ));
        assert!(!ConsentStatus::can_transition(
            ConsentStatus::Withdrawn,
            ConsentStatus::Granted
        ));
        assert!(!ConsentStatus::can_transition(
            ConsentStatus::Expired,
            ConsentStatus::Granted
        ));
        assert!(!ConsentStatus::can_transition(
            ConsentStatus::Expired,
            ConsentStatus::Withdrawn
        ));
    }

    #[test]
    fn test_expiry_window() {
        let now = Utc::now();
        let mut consent = Consent::grant(Uuid::new_v4(), Uuid::new_v4(), None);

        // No expiry: never past, never expiring soon
        assert!(!consent.is_past_expiry(now));
        assert_eq!(consent.days_until_expiry(now), None);

        // Inside the 30-day notice window
        consent.expires_at = Some(now + Duration::days(12));
        assert!(!consent.is_past_expiry(now));
        assert_eq!(consent.days_until_expiry(now), Some(12));

        // Beyond the window: no notice yet
        consent.expires_at = Some(now + Duration::days(45));
        assert_eq!(consent.days_until_expiry(now), None);

        // Past expiry
        consent.expires_at = Some(now - Duration::hours(1));
        assert!(consent.is_past_expiry(now));
        assert_eq!(consent.days_until_expiry(now), None);
    }

    #[test]
    fn test_last_day_counts_as_one() {
        let now = Utc::now();
        let mut consent = Consent::grant(Uuid::new_v4(), Uuid::new_v4(), None);
        consent.expires_at = Some(now + Duration::hours(6));
        assert_eq!(consent.days_until_expiry(now), Some(1));
    }
}
