//! Data Subject Request domain entity
//!
//! The request state machine, regulator deadline table, and the
//! monotonic escalation tiers driven by remaining time.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CoreError, CoreResult};
use crate::events::EventType;
use crate::ids::uuid7;

/// Kind of data-subject request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsrType {
    Access,
    Erasure,
    Portability,
    Rectification,
    Restriction,
    Objection,
}

/// Request processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsrStatus {
    Pending,
    Verified,
    InProgress,
    AwaitingInfo,
    Completed,
    Rejected,
    Cancelled,
}

impl DsrStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DsrStatus::Completed | DsrStatus::Rejected | DsrStatus::Cancelled
        )
    }

    /// Whether the request still counts against its deadline
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            DsrStatus::Pending | DsrStatus::Verified | DsrStatus::InProgress
        )
    }

    /// The allowed-transition table
    pub fn can_transition(from: DsrStatus, to: DsrStatus) -> bool {
        use DsrStatus::*;
        matches!(
            (from, to),
            (Pending, Verified)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Verified, InProgress)
                | (Verified, Rejected)
                | (InProgress, AwaitingInfo)
                | (InProgress, Completed)
                | (InProgress, Rejected)
                | (AwaitingInfo, InProgress)
                | (AwaitingInfo, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DsrStatus::Pending => "PENDING",
            DsrStatus::Verified => "VERIFIED",
            DsrStatus::InProgress => "IN_PROGRESS",
            DsrStatus::AwaitingInfo => "AWAITING_INFO",
            DsrStatus::Completed => "COMPLETED",
            DsrStatus::Rejected => "REJECTED",
            DsrStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsrPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// Regulator the request is filed under; decides the statutory deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegalBasis {
    Gdpr,
    Ccpa,
    Pipa,
    Appi,
    Other,
}

impl LegalBasis {
    /// Statutory response window in days
    pub fn deadline_days(&self) -> i64 {
        match self {
            LegalBasis::Gdpr => 30,
            LegalBasis::Ccpa => 45,
            LegalBasis::Pipa => 10,
            LegalBasis::Appi => 14,
            LegalBasis::Other => 30,
        }
    }
}

/// Monotone escalation tiers driven by remaining time to deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationLevel {
    None,
    Warning,
    Critical,
    Overdue,
}

impl EscalationLevel {
    /// Tier for the remaining time to the effective deadline
    pub fn for_remaining(remaining: Duration) -> Self {
        if remaining <= Duration::zero() {
            EscalationLevel::Overdue
        } else if remaining <= Duration::days(2) {
            EscalationLevel::Critical
        } else if remaining <= Duration::days(7) {
            EscalationLevel::Warning
        } else {
            EscalationLevel::None
        }
    }

    /// The deadline event announcing this tier, if any
    pub fn event_type(&self) -> Option<EventType> {
        match self {
            EscalationLevel::None => None,
            EscalationLevel::Warning => Some(EventType::DsrDeadlineWarning),
            EscalationLevel::Critical => Some(EventType::DsrDeadlineCritical),
            EscalationLevel::Overdue => Some(EventType::DsrDeadlineOverdue),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationLevel::None => "NONE",
            EscalationLevel::Warning => "WARNING",
            EscalationLevel::Critical => "CRITICAL",
            EscalationLevel::Overdue => "OVERDUE",
        }
    }
}

/// Requested processing scope, parsed from the API boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsrScope {
    #[serde(default)]
    pub data_categories: Vec<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Shape of the operator's response to the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DsrResponseType {
    Data,
    Confirmation,
    Denial,
}

/// A data-subject request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsrRequest {
    pub id: Uuid,
    pub account_id: Uuid,
    pub request_type: DsrType,
    pub status: DsrStatus,
    pub priority: DsrPriority,
    pub scope: DsrScope,
    pub legal_basis: LegalBasis,
    pub deadline: DateTime<Utc>,
    pub extended_deadline: Option<DateTime<Utc>>,
    pub extension_reason: Option<String>,
    pub escalation_level: EscalationLevel,
    pub escalated_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub processed_by: Option<Uuid>,
    pub response_type: Option<DsrResponseType>,
    pub response_body: Option<String>,
    pub response_note: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DsrRequest {
    /// Submit a new request; the deadline derives from the legal basis
    pub fn submit(
        account_id: Uuid,
        request_type: DsrType,
        legal_basis: LegalBasis,
        scope: DsrScope,
        priority: DsrPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid7::generate(),
            account_id,
            request_type,
            status: DsrStatus::Pending,
            priority,
            scope,
            legal_basis,
            deadline: now + Duration::days(legal_basis.deadline_days()),
            extended_deadline: None,
            extension_reason: None,
            escalation_level: EscalationLevel::None,
            escalated_at: None,
            assigned_to: None,
            processed_by: None,
            response_type: None,
            response_body: None,
            response_note: None,
            verified_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The deadline escalation is measured against
    pub fn effective_deadline(&self) -> DateTime<Utc> {
        self.extended_deadline.unwrap_or(self.deadline)
    }

    /// Guard and apply a status transition
    pub fn transition(&mut self, to: DsrStatus) -> CoreResult<()> {
        if !DsrStatus::can_transition(self.status, to) {
            return Err(CoreError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }
        let now = Utc::now();
        match to {
            DsrStatus::Verified => self.verified_at = Some(now),
            DsrStatus::Completed => self.completed_at = Some(now),
            _ => {}
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Guard a deadline extension: one per request, bounded by doubling
    /// the statutory window
    pub fn ensure_extendable(&self, new_deadline: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.is_open() {
            return Err(CoreError::precondition(
                "only open requests can have their deadline extended",
            ));
        }
        if self.extended_deadline.is_some() {
            return Err(CoreError::conflict(
                "the regulator-permitted extension has already been used",
            ));
        }
        if new_deadline <= self.deadline {
            return Err(CoreError::validation(
                "extended deadline must be after the current deadline",
            ));
        }
        let cap = self.deadline + Duration::days(self.legal_basis.deadline_days());
        if new_deadline > cap {
            return Err(CoreError::validation(
                "extended deadline exceeds the regulator-permitted maximum",
            ));
        }
        Ok(())
    }

    /// Compute the escalation tier, enforcing monotonicity: once raised,
    /// a request never drops back
    pub fn escalation_for(&self, now: DateTime<Utc>) -> EscalationLevel {
        let computed = EscalationLevel::for_remaining(self.effective_deadline() - now);
        computed.max(self.escalation_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(basis: LegalBasis) -> DsrRequest {
        DsrRequest::submit(
            Uuid::new_v4(),
            DsrType::Access,
            basis,
            DsrScope::default(),
            DsrPriority::Normal,
        )
    }

    #[test]
    fn test_deadline_table() {
        assert_eq!(LegalBasis::Gdpr.deadline_days(), 30);
        assert_eq!(LegalBasis::Ccpa.deadline_days(), 45);
        assert_eq!(LegalBasis::Pipa.deadline_days(), 10);
        assert_eq!(LegalBasis::Appi.deadline_days(), 14);
        assert_eq!(LegalBasis::Other.deadline_days(), 30);
    }

    #[test]
    fn test_submit_sets_deadline() {
        let r = request(LegalBasis::Gdpr);
        let expected = r.created_at + Duration::days(30);
        assert_eq!(r.deadline, expected);
        assert_eq!(r.status, DsrStatus::Pending);
        assert_eq!(r.escalation_level, EscalationLevel::None);
    }

    #[test]
    fn test_transition_table() {
        use DsrStatus::*;

        let allowed = [
            (Pending, Verified),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Verified, InProgress),
            (Verified, Rejected),
            (InProgress, AwaitingInfo),
            (InProgress, Completed),
            (InProgress, Rejected),
            (AwaitingInfo, InProgress),
            (AwaitingInfo, Cancelled),
        ];
        for (from, to) in allowed {
            assert!(DsrStatus::can_transition(from, to), "{from:?} -> {to:?}");
        }

        // Terminal states accept nothing
        for terminal in [Completed, Rejected, Cancelled] {
            for to in [
                Pending,
                Verified,
                InProgress,
                AwaitingInfo,
                Completed,
                Rejected,
                Cancelled,
            ] {
                assert!(!DsrStatus::can_transition(terminal, to));
            }
        }

        assert!(!DsrStatus::can_transition(Pending, InProgress));
        assert!(!DsrStatus::can_transition(Verified, Cancelled));
    }

    #[test]
    fn test_transition_stamps_timestamps() {
        let mut r = request(LegalBasis::Pipa);

        r.transition(DsrStatus::Verified).unwrap();
        assert!(r.verified_at.is_some());

        r.transition(DsrStatus::InProgress).unwrap();
        r.transition(DsrStatus::Completed).unwrap();
        assert!(r.completed_at.is_some());

        // Terminal: no further moves
        assert!(r.transition(DsrStatus::Pending).is_err());
    }

    #[test]
    fn test_escalation_tiers() {
        assert_eq!(
            EscalationLevel::for_remaining(Duration::days(10)),
            EscalationLevel::None
        );
        assert_eq!(
            EscalationLevel::for_remaining(Duration::days(5)),
            EscalationLevel::Warning
        );
        assert_eq!(
            EscalationLevel::for_remaining(Duration::days(7)),
            EscalationLevel::Warning
        );
        assert_eq!(
            EscalationLevel::for_remaining(Duration::days(1)),
            EscalationLevel::Critical
        );
        assert_eq!(
            EscalationLevel::for_remaining(Duration::days(2)),
            EscalationLevel::Critical
        );
        assert_eq!(
            EscalationLevel::for_remaining(Duration::zero()),
            EscalationLevel::Overdue
        );
        assert_eq!(
            EscalationLevel::for_remaining(Duration::days(-3)),
            EscalationLevel::Overdue
        );
    }

    #[test]
    fn test_escalation_is_monotonic() {
        let mut r = request(LegalBasis::Gdpr);
        r.escalation_level = EscalationLevel::Critical;

        // Deadline extension would compute a lower tier; the recorded
        // level still wins
        r.extended_deadline = Some(Utc::now() + Duration::days(30));
        assert_eq!(r.escalation_for(Utc::now()), EscalationLevel::Critical);
    }

    #[test]
    fn test_escalation_scenario_gdpr() {
        let r = request(LegalBasis::Gdpr);
        let t = r.created_at;

        assert_eq!(r.escalation_for(t + Duration::days(10)), EscalationLevel::None);
        assert_eq!(
            r.escalation_for(t + Duration::days(25)),
            EscalationLevel::Warning
        );
        assert_eq!(
            r.escalation_for(t + Duration::days(29)),
            EscalationLevel::Critical
        );
        assert_eq!(
            r.escalation_for(t + Duration::days(31)),
            EscalationLevel::Overdue
        );
    }

    #[test]
    fn test_extension_guards() {
        let mut r = request(LegalBasis::Gdpr);

        // Must be after the current deadline
        assert!(r.ensure_extendable(r.deadline - Duration::days(1)).is_err());

        // Doubling is the cap
        assert!(r
            .ensure_extendable(r.deadline + Duration::days(31))
            .is_err());
        assert!(r
            .ensure_extendable(r.deadline + Duration::days(30))
            .is_ok());

        // Only one extension
        r.extended_deadline = Some(r.deadline + Duration::days(10));
        assert!(r
            .ensure_extendable(r.deadline + Duration::days(20))
            .is_err());

        // Closed requests cannot extend
        let mut closed = request(LegalBasis::Gdpr);
        closed.transition(DsrStatus::Rejected).unwrap();
        assert!(closed
            .ensure_extendable(closed.deadline + Duration::days(5))
            .is_err());
    }

    #[test]
    fn test_effective_deadline() {
        let mut r = request(LegalBasis::Appi);
        assert_eq!(r.effective_deadline(), r.deadline);

        let extended = r.deadline + Duration::days(7);
        r.extended_deadline = Some(extended);
        assert_eq!(r.effective_deadline(), extended);
    }
}
