//! Sanction domain entity and its state machines
//!
//! A sanction moves `ACTIVE -> REVOKED` (operator) or `ACTIVE ->
//! EXPIRED` (sweeper); terminal states are immutable. The appeal
//! sub-machine runs `PENDING -> UNDER_REVIEW -> {APPROVED | REJECTED |
//! ESCALATED}`, one appeal per sanction, and an approved appeal revokes
//! the sanction atomically with the decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::errors::{CoreError, CoreResult};
use crate::ids::uuid7;

/// Who the sanction targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectType {
    Account,
    Operator,
}

/// Kind of moderation measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctionType {
    Warning,
    TemporaryBan,
    PermanentBan,
    FeatureRestriction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctionSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Sanction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SanctionStatus {
    Active,
    Expired,
    Revoked,
}

impl SanctionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SanctionStatus::Expired | SanctionStatus::Revoked)
    }

    /// Whether a transition between statuses is legal
    pub fn can_transition(from: SanctionStatus, to: SanctionStatus) -> bool {
        matches!(
            (from, to),
            (SanctionStatus::Active, SanctionStatus::Revoked)
                | (SanctionStatus::Active, SanctionStatus::Expired)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SanctionStatus::Active => "ACTIVE",
            SanctionStatus::Expired => "EXPIRED",
            SanctionStatus::Revoked => "REVOKED",
        }
    }
}

/// Appeal sub-state, defined only once an appeal has been submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppealStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Escalated,
}

impl AppealStatus {
    pub fn is_decided(&self) -> bool {
        matches!(
            self,
            AppealStatus::Approved | AppealStatus::Rejected | AppealStatus::Escalated
        )
    }

    pub fn can_transition(from: AppealStatus, to: AppealStatus) -> bool {
        matches!(
            (from, to),
            (AppealStatus::Pending, AppealStatus::UnderReview)
                | (AppealStatus::UnderReview, AppealStatus::Approved)
                | (AppealStatus::UnderReview, AppealStatus::Rejected)
                | (AppealStatus::UnderReview, AppealStatus::Escalated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppealStatus::Pending => "PENDING",
            AppealStatus::UnderReview => "UNDER_REVIEW",
            AppealStatus::Approved => "APPROVED",
            AppealStatus::Rejected => "REJECTED",
            AppealStatus::Escalated => "ESCALATED",
        }
    }
}

/// Appeal details attached to a sanction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appeal {
    pub status: AppealStatus,
    pub reason: String,
    pub evidence_urls: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewer_id: Option<Uuid>,
    pub response: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// A subject-scoped moderation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sanction {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    /// None = platform-wide; Some = scoped to one service
    pub service_id: Option<Uuid>,
    pub sanction_type: SanctionType,
    pub severity: SanctionSeverity,
    pub restricted_features: Vec<String>,
    pub reason: String,
    pub internal_note: Option<String>,
    pub evidence_urls: Vec<String>,
    pub issuer_id: Uuid,
    pub issuer_type: SubjectType,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub status: SanctionStatus,
    pub revoked_by: Option<Uuid>,
    pub revoke_reason: Option<String>,
    pub appeal: Option<Appeal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sanction {
    /// Create an active sanction, validating the window invariant
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subject_id: Uuid,
        subject_type: SubjectType,
        service_id: Option<Uuid>,
        sanction_type: SanctionType,
        severity: SanctionSeverity,
        reason: String,
        issuer_id: Uuid,
        issuer_type: SubjectType,
        start_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
    ) -> CoreResult<Self> {
        if let Some(end) = end_at {
            if start_at > end {
                return Err(CoreError::validation(
                    "sanction start must not be after its end",
                ));
            }
        }
        if sanction_type == SanctionType::PermanentBan && end_at.is_some() {
            return Err(CoreError::validation(
                "a permanent ban cannot carry an end date",
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: uuid7::generate(),
            subject_id,
            subject_type,
            service_id,
            sanction_type,
            severity,
            restricted_features: Vec::new(),
            reason,
            internal_note: None,
            evidence_urls: Vec::new(),
            issuer_id,
            issuer_type,
            start_at,
            end_at,
            status: SanctionStatus::Active,
            revoked_by: None,
            revoke_reason: None,
            appeal: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the sanction window contains `now`
    pub fn is_in_window(&self, now: DateTime<Utc>) -> bool {
        if self.start_at > now {
            return false;
        }
        self.end_at.map(|end| end > now).unwrap_or(true)
    }

    /// Whether the sanction applies to a query scope
    ///
    /// Platform-wide sanctions always match; service-scoped ones match
    /// only the same service.
    pub fn matches_scope(&self, service_id: Option<Uuid>) -> bool {
        match self.service_id {
            None => true,
            Some(own) => service_id == Some(own),
        }
    }

    /// Guard for operator revocation
    pub fn ensure_revocable(&self) -> CoreResult<()> {
        if self.status != SanctionStatus::Active {
            return Err(CoreError::precondition(format!(
                "only active sanctions can be revoked, current status is {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// Guard for extend/reduce amendments
    pub fn ensure_amendable(&self) -> CoreResult<()> {
        if self.status != SanctionStatus::Active {
            return Err(CoreError::precondition(format!(
                "only active sanctions can be amended, current status is {}",
                self.status.as_str()
            )));
        }
        if self.sanction_type == SanctionType::PermanentBan {
            return Err(CoreError::precondition(
                "a permanent ban has no end date to amend",
            ));
        }
        Ok(())
    }

    /// Guard for appeal submission by a subject
    pub fn ensure_appealable(&self, appellant_id: Uuid) -> CoreResult<()> {
        if self.subject_id != appellant_id {
            return Err(CoreError::precondition(
                "only the sanctioned subject may appeal",
            ));
        }
        if self.status != SanctionStatus::Active {
            return Err(CoreError::precondition(
                "only active sanctions can be appealed",
            ));
        }
        if self.appeal.is_some() {
            return Err(CoreError::conflict(
                "an appeal has already been submitted for this sanction",
            ));
        }
        Ok(())
    }
}

/// Result of the active-set query for a subject
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSanctions {
    pub sanctions: Vec<Sanction>,
    pub restricted_features: BTreeSet<String>,
    pub is_permanently_banned: bool,
}

impl ActiveSanctions {
    /// Fold in-window, scope-matching sanctions into the summary
    pub fn collect(
        sanctions: Vec<Sanction>,
        service_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut active = Vec::new();
        let mut restricted_features = BTreeSet::new();
        let mut is_permanently_banned = false;

        for sanction in sanctions {
            if sanction.status != SanctionStatus::Active
                || !sanction.is_in_window(now)
                || !sanction.matches_scope(service_id)
            {
                continue;
            }
            restricted_features.extend(sanction.restricted_features.iter().cloned());
            if sanction.sanction_type == SanctionType::PermanentBan {
                is_permanently_banned = true;
            }
            active.push(sanction);
        }

        Self {
            sanctions: active,
            restricted_features,
            is_permanently_banned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sanction(end_at: Option<DateTime<Utc>>) -> Sanction {
        Sanction::new(
            Uuid::new_v4(),
            SubjectType::Account,
            None,
            SanctionType::TemporaryBan,
            SanctionSeverity::High,
            "spam".to_string(),
            Uuid::new_v4(),
            SubjectType::Operator,
            Utc::now() - Duration::minutes(1),
            end_at,
        )
        .unwrap()
    }

    #[test]
    fn test_window_invariant() {
        let now = Utc::now();
        let result = Sanction::new(
            Uuid::new_v4(),
            SubjectType::Account,
            None,
            SanctionType::TemporaryBan,
            SanctionSeverity::Low,
            "test".to_string(),
            Uuid::new_v4(),
            SubjectType::Operator,
            now,
            Some(now - Duration::hours(1)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_permanent_ban_has_no_end() {
        let now = Utc::now();
        let result = Sanction::new(
            Uuid::new_v4(),
            SubjectType::Account,
            None,
            SanctionType::PermanentBan,
            SanctionSeverity::Critical,
            "fraud".to_string(),
            Uuid::new_v4(),
            SubjectType::Operator,
            now,
            Some(now + Duration::days(1)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(SanctionStatus::can_transition(
            SanctionStatus::Active,
            SanctionStatus::Revoked
        ));
        assert!(SanctionStatus::can_transition(
            SanctionStatus::Active,
            SanctionStatus::Expired
        ));
        // Terminal states are immutable
        assert!(!SanctionStatus::can_transition(
            SanctionStatus::Revoked,
            SanctionStatus::Active
        ));
        assert!(!SanctionStatus::can_transition(
            SanctionStatus::Expired,
            SanctionStatus::Revoked
        ));
    }

    #[test]
    fn test_appeal_transitions() {
        assert!(AppealStatus::can_transition(
            AppealStatus::Pending,
            AppealStatus::UnderReview
        ));
        assert!(AppealStatus::can_transition(
            AppealStatus::UnderReview,
            AppealStatus::Approved
        ));
        assert!(!AppealStatus::can_transition(
            AppealStatus::Pending,
            AppealStatus::Approved
        ));
        assert!(!AppealStatus::can_transition(
            AppealStatus::Approved,
            AppealStatus::UnderReview
        ));
    }

    #[test]
    fn test_appeal_guards() {
        let s = sanction(None);

        // Wrong subject cannot appeal
        assert!(s.ensure_appealable(Uuid::new_v4()).is_err());
        // The subject can
        assert!(s.ensure_appealable(s.subject_id).is_ok());

        // Only one appeal per sanction
        let mut appealed = s.clone();
        appealed.appeal = Some(Appeal {
            status: AppealStatus::Pending,
            reason: "unfair".to_string(),
            evidence_urls: vec![],
            submitted_at: Utc::now(),
            reviewer_id: None,
            response: None,
            reviewed_at: None,
        });
        assert!(appealed.ensure_appealable(appealed.subject_id).is_err());
    }

    #[test]
    fn test_scope_matching() {
        let platform = sanction(None);
        assert!(platform.matches_scope(None));
        assert!(platform.matches_scope(Some(Uuid::new_v4())));

        let service = Uuid::new_v4();
        let mut scoped = sanction(None);
        scoped.service_id = Some(service);
        assert!(scoped.matches_scope(Some(service)));
        assert!(!scoped.matches_scope(Some(Uuid::new_v4())));
        assert!(!scoped.matches_scope(None));
    }

    #[test]
    fn test_active_set_collection() {
        let now = Utc::now();
        let subject = Uuid::new_v4();

        let mut banned = sanction(None);
        banned.subject_id = subject;
        banned.sanction_type = SanctionType::PermanentBan;

        let mut restricted = sanction(Some(now + Duration::days(1)));
        restricted.subject_id = subject;
        restricted.sanction_type = SanctionType::FeatureRestriction;
        restricted.restricted_features = vec!["chat".to_string(), "upload".to_string()];

        let mut expired = sanction(Some(now + Duration::days(1)));
        expired.subject_id = subject;
        expired.status = SanctionStatus::Expired;

        let summary =
            ActiveSanctions::collect(vec![banned, restricted, expired], None, now);

        assert_eq!(summary.sanctions.len(), 2);
        assert!(summary.is_permanently_banned);
        assert!(summary.restricted_features.contains("chat"));
        assert!(summary.restricted_features.contains("upload"));
    }

    #[test]
    fn test_amend_guards() {
        let mut s = sanction(Some(Utc::now() + Duration::days(1)));
        assert!(s.ensure_amendable().is_ok());

        s.status = SanctionStatus::Expired;
        assert!(s.ensure_amendable().is_err());

        let mut permanent = sanction(None);
        permanent.sanction_type = SanctionType::PermanentBan;
        assert!(permanent.ensure_amendable().is_err());
    }
}
