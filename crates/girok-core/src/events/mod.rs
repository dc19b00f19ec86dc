//! Event catalog
//!
//! Stable event-type tokens and their payload shapes. Every observable
//! state transition commits exactly one of these through the outbox; the
//! tokens are part of the external contract and never renamed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregates that own outbox events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    Account,
    Session,
    Sanction,
    Consent,
    DsrRequest,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Account => "account",
            AggregateType::Session => "session",
            AggregateType::Sanction => "sanction",
            AggregateType::Consent => "consent",
            AggregateType::DsrRequest => "dsr_request",
        }
    }
}

impl std::fmt::Display for AggregateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable event-type tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "ACCOUNT_REGISTERED")]
    AccountRegistered,
    #[serde(rename = "LOGIN_SUCCESS")]
    LoginSuccess,
    #[serde(rename = "MFA_FAILED")]
    MfaFailed,
    #[serde(rename = "LOGOUT")]
    Logout,
    #[serde(rename = "PASSWORD_CHANGED")]
    PasswordChanged,
    #[serde(rename = "MFA_ENABLED")]
    MfaEnabled,
    #[serde(rename = "MFA_DISABLED")]
    MfaDisabled,
    #[serde(rename = "SANCTION_APPLIED")]
    SanctionApplied,
    #[serde(rename = "SANCTION_REVOKED")]
    SanctionRevoked,
    #[serde(rename = "SANCTION_EXTENDED")]
    SanctionExtended,
    #[serde(rename = "SANCTION_REDUCED")]
    SanctionReduced,
    #[serde(rename = "SANCTION_APPEAL_SUBMITTED")]
    SanctionAppealSubmitted,
    #[serde(rename = "SANCTION_APPEAL_REVIEWED")]
    SanctionAppealReviewed,
    #[serde(rename = "CONSENT_GRANTED")]
    ConsentGranted,
    #[serde(rename = "CONSENT_WITHDRAWN")]
    ConsentWithdrawn,
    #[serde(rename = "CONSENT_EXPIRING_SOON")]
    ConsentExpiringSoon,
    #[serde(rename = "CONSENT_EXPIRED")]
    ConsentExpired,
    #[serde(rename = "DSR_SUBMITTED")]
    DsrSubmitted,
    #[serde(rename = "DSR_STATUS_CHANGED")]
    DsrStatusChanged,
    #[serde(rename = "DSR_ASSIGNED")]
    DsrAssigned,
    #[serde(rename = "DSR_DEADLINE_EXTENDED")]
    DsrDeadlineExtended,
    #[serde(rename = "DSR_DEADLINE_WARNING")]
    DsrDeadlineWarning,
    #[serde(rename = "DSR_DEADLINE_CRITICAL")]
    DsrDeadlineCritical,
    #[serde(rename = "DSR_DEADLINE_OVERDUE")]
    DsrDeadlineOverdue,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::AccountRegistered => "ACCOUNT_REGISTERED",
            EventType::LoginSuccess => "LOGIN_SUCCESS",
            EventType::MfaFailed => "MFA_FAILED",
            EventType::Logout => "LOGOUT",
            EventType::PasswordChanged => "PASSWORD_CHANGED",
            EventType::MfaEnabled => "MFA_ENABLED",
            EventType::MfaDisabled => "MFA_DISABLED",
            EventType::SanctionApplied => "SANCTION_APPLIED",
            EventType::SanctionRevoked => "SANCTION_REVOKED",
            EventType::SanctionExtended => "SANCTION_EXTENDED",
            EventType::SanctionReduced => "SANCTION_REDUCED",
            EventType::SanctionAppealSubmitted => "SANCTION_APPEAL_SUBMITTED",
            EventType::SanctionAppealReviewed => "SANCTION_APPEAL_REVIEWED",
            EventType::ConsentGranted => "CONSENT_GRANTED",
            EventType::ConsentWithdrawn => "CONSENT_WITHDRAWN",
            EventType::ConsentExpiringSoon => "CONSENT_EXPIRING_SOON",
            EventType::ConsentExpired => "CONSENT_EXPIRED",
            EventType::DsrSubmitted => "DSR_SUBMITTED",
            EventType::DsrStatusChanged => "DSR_STATUS_CHANGED",
            EventType::DsrAssigned => "DSR_ASSIGNED",
            EventType::DsrDeadlineExtended => "DSR_DEADLINE_EXTENDED",
            EventType::DsrDeadlineWarning => "DSR_DEADLINE_WARNING",
            EventType::DsrDeadlineCritical => "DSR_DEADLINE_CRITICAL",
            EventType::DsrDeadlineOverdue => "DSR_DEADLINE_OVERDUE",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topic for the daily DSR summary, which is observational and not tied
/// to a single aggregate row
pub const DSR_DAILY_SUMMARY_TOPIC: &str = "dsr.daily.summary";

/// Serialized form of an outbox row as delivered to the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

// Payloads for events whose consumers need structure beyond the
// envelope itself.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentExpiringSoonPayload {
    pub consent_id: Uuid,
    pub account_id: Uuid,
    pub document_id: Uuid,
    pub days_until_expiry: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentExpiredPayload {
    pub consent_id: Uuid,
    pub account_id: Uuid,
    pub document_id: Uuid,
    pub expired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsrDeadlinePayload {
    pub request_id: Uuid,
    pub account_id: Uuid,
    pub escalation_level: String,
    pub effective_deadline: DateTime<Utc>,
    pub remaining_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsrDailySummaryPayload {
    pub date: String,
    pub pending: u64,
    pub in_progress: u64,
    pub approaching_deadline: u64,
    pub overdue: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tokens_are_stable() {
        assert_eq!(EventType::SanctionApplied.as_str(), "SANCTION_APPLIED");
        assert_eq!(
            EventType::SanctionAppealReviewed.as_str(),
            "SANCTION_APPEAL_REVIEWED"
        );
        assert_eq!(
            EventType::ConsentExpiringSoon.as_str(),
            "CONSENT_EXPIRING_SOON"
        );
        assert_eq!(
            EventType::DsrDeadlineOverdue.as_str(),
            "DSR_DEADLINE_OVERDUE"
        );
    }

    #[test]
    fn test_event_type_serde_matches_tokens() {
        let json = serde_json::to_string(&EventType::DsrDeadlineWarning).unwrap();
        assert_eq!(json, "\"DSR_DEADLINE_WARNING\"");

        let back: EventType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventType::DsrDeadlineWarning);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = EventEnvelope {
            aggregate_type: AggregateType::Sanction,
            aggregate_id: Uuid::new_v4(),
            event_type: EventType::SanctionApplied.as_str().to_string(),
            payload: serde_json::json!({"reason": "spam"}),
            occurred_at: Utc::now(),
        };

        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.aggregate_id, envelope.aggregate_id);
        assert_eq!(back.event_type, "SANCTION_APPLIED");
    }

    #[test]
    fn test_payload_field_names_are_camel_case() {
        let payload = ConsentExpiringSoonPayload {
            consent_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            days_until_expiry: 12,
            expires_at: Utc::now(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("daysUntilExpiry").is_some());
    }
}
