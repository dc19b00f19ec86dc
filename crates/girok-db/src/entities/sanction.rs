//! Sanction entity model for SeaORM

use super::*;
use crate::error::{DbError, DbResult};
use girok_core::entities::sanction as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sanctions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub subject_id: Uuid,

    pub subject_type: SubjectType,

    pub service_id: Option<Uuid>,

    pub sanction_type: SanctionType,

    pub severity: SanctionSeverity,

    /// JSON array of restricted feature names
    #[sea_orm(column_type = "JsonBinary")]
    pub restricted_features: Json,

    pub reason: String,

    pub internal_note: Option<String>,

    /// JSON array of evidence URLs
    #[sea_orm(column_type = "JsonBinary")]
    pub evidence_urls: Json,

    pub issuer_id: Uuid,

    pub issuer_type: SubjectType,

    pub start_at: chrono::DateTime<chrono::Utc>,

    pub end_at: Option<chrono::DateTime<chrono::Utc>>,

    pub status: SanctionStatus,

    pub revoked_by: Option<Uuid>,

    pub revoke_reason: Option<String>,

    pub appeal_status: Option<AppealStatus>,

    pub appeal_reason: Option<String>,

    /// JSON array of appeal evidence URLs
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub appeal_evidence_urls: Option<Json>,

    pub appeal_submitted_at: Option<chrono::DateTime<chrono::Utc>>,

    pub appeal_reviewer_id: Option<Uuid>,

    pub appeal_response: Option<String>,

    pub appeal_reviewed_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum SubjectType {
    #[sea_orm(string_value = "ACCOUNT")]
    Account,
    #[sea_orm(string_value = "OPERATOR")]
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum SanctionType {
    #[sea_orm(string_value = "WARNING")]
    Warning,
    #[sea_orm(string_value = "TEMPORARY_BAN")]
    TemporaryBan,
    #[sea_orm(string_value = "PERMANENT_BAN")]
    PermanentBan,
    #[sea_orm(string_value = "FEATURE_RESTRICTION")]
    FeatureRestriction,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum SanctionSeverity {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum SanctionStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    #[sea_orm(string_value = "REVOKED")]
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum AppealStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "UNDER_REVIEW")]
    UnderReview,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "ESCALATED")]
    Escalated,
}

impl From<domain::SubjectType> for SubjectType {
    fn from(value: domain::SubjectType) -> Self {
        match value {
            domain::SubjectType::Account => SubjectType::Account,
            domain::SubjectType::Operator => SubjectType::Operator,
        }
    }
}

impl From<SubjectType> for domain::SubjectType {
    fn from(value: SubjectType) -> Self {
        match value {
            SubjectType::Account => domain::SubjectType::Account,
            SubjectType::Operator => domain::SubjectType::Operator,
        }
    }
}

impl From<domain::SanctionType> for SanctionType {
    fn from(value: domain::SanctionType) -> Self {
        match value {
            domain::SanctionType::Warning => SanctionType::Warning,
            domain::SanctionType::TemporaryBan => SanctionType::TemporaryBan,
            domain::SanctionType::PermanentBan => SanctionType::PermanentBan,
            domain::SanctionType::FeatureRestriction => SanctionType::FeatureRestriction,
        }
    }
}

impl From<SanctionType> for domain::SanctionType {
    fn from(value: SanctionType) -> Self {
        match value {
            SanctionType::Warning => domain::SanctionType::Warning,
            SanctionType::TemporaryBan => domain::SanctionType::TemporaryBan,
            SanctionType::PermanentBan => domain::SanctionType::PermanentBan,
            SanctionType::FeatureRestriction => domain::SanctionType::FeatureRestriction,
        }
    }
}

impl From<domain::SanctionSeverity> for SanctionSeverity {
    fn from(value: domain::SanctionSeverity) -> Self {
        match value {
            domain::SanctionSeverity::Low => SanctionSeverity::Low,
            domain::SanctionSeverity::Medium => SanctionSeverity::Medium,
            domain::SanctionSeverity::High => SanctionSeverity::High,
            domain::SanctionSeverity::Critical => SanctionSeverity::Critical,
        }
    }
}

impl From<SanctionSeverity> for domain::SanctionSeverity {
    fn from(value: SanctionSeverity) -> Self {
        match value {
            SanctionSeverity::Low => domain::SanctionSeverity::Low,
            SanctionSeverity::Medium => domain::SanctionSeverity::Medium,
            SanctionSeverity::High => domain::SanctionSeverity::High,
            SanctionSeverity::Critical => domain::SanctionSeverity::Critical,
        }
    }
}

impl From<domain::SanctionStatus> for SanctionStatus {
    fn from(value: domain::SanctionStatus) -> Self {
        match value {
            domain::SanctionStatus::Active => SanctionStatus::Active,
            domain::SanctionStatus::Expired => SanctionStatus::Expired,
            domain::SanctionStatus::Revoked => SanctionStatus::Revoked,
        }
    }
}

impl From<SanctionStatus> for domain::SanctionStatus {
    fn from(value: SanctionStatus) -> Self {
        match value {
            SanctionStatus::Active => domain::SanctionStatus::Active,
            SanctionStatus::Expired => domain::SanctionStatus::Expired,
            SanctionStatus::Revoked => domain::SanctionStatus::Revoked,
        }
    }
}

impl From<domain::AppealStatus> for AppealStatus {
    fn from(value: domain::AppealStatus) -> Self {
        match value {
            domain::AppealStatus::Pending => AppealStatus::Pending,
            domain::AppealStatus::UnderReview => AppealStatus::UnderReview,
            domain::AppealStatus::Approved => AppealStatus::Approved,
            domain::AppealStatus::Rejected => AppealStatus::Rejected,
            domain::AppealStatus::Escalated => AppealStatus::Escalated,
        }
    }
}

impl From<AppealStatus> for domain::AppealStatus {
    fn from(value: AppealStatus) -> Self {
        match value {
            AppealStatus::Pending => domain::AppealStatus::Pending,
            AppealStatus::UnderReview => domain::AppealStatus::UnderReview,
            AppealStatus::Approved => domain::AppealStatus::Approved,
            AppealStatus::Rejected => domain::AppealStatus::Rejected,
            AppealStatus::Escalated => domain::AppealStatus::Escalated,
        }
    }
}

impl Model {
    /// Convert to the domain entity, parsing the JSON columns
    pub fn into_domain(self) -> DbResult<domain::Sanction> {
        let restricted_features: Vec<String> =
            serde_json::from_value(self.restricted_features).map_err(DbError::from)?;
        let evidence_urls: Vec<String> =
            serde_json::from_value(self.evidence_urls).map_err(DbError::from)?;

        let appeal = match self.appeal_status {
            Some(status) => Some(domain::Appeal {
                status: status.into(),
                reason: self.appeal_reason.unwrap_or_default(),
                evidence_urls: self
                    .appeal_evidence_urls
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(DbError::from)?
                    .unwrap_or_default(),
                submitted_at: self.appeal_submitted_at.unwrap_or(self.created_at),
                reviewer_id: self.appeal_reviewer_id,
                response: self.appeal_response,
                reviewed_at: self.appeal_reviewed_at,
            }),
            None => None,
        };

        Ok(domain::Sanction {
            id: self.id,
            subject_id: self.subject_id,
            subject_type: self.subject_type.into(),
            service_id: self.service_id,
            sanction_type: self.sanction_type.into(),
            severity: self.severity.into(),
            restricted_features,
            reason: self.reason,
            internal_note: self.internal_note,
            evidence_urls,
            issuer_id: self.issuer_id,
            issuer_type: self.issuer_type.into(),
            start_at: self.start_at,
            end_at: self.end_at,
            status: self.status.into(),
            revoked_by: self.revoked_by,
            revoke_reason: self.revoke_reason,
            appeal,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<domain::Sanction> for ActiveModel {
    fn from(sanction: domain::Sanction) -> Self {
        let (
            appeal_status,
            appeal_reason,
            appeal_evidence_urls,
            appeal_submitted_at,
            appeal_reviewer_id,
            appeal_response,
            appeal_reviewed_at,
        ) = match sanction.appeal {
            Some(appeal) => (
                Some(appeal.status.into()),
                Some(appeal.reason),
                Some(serde_json::json!(appeal.evidence_urls)),
                Some(appeal.submitted_at),
                appeal.reviewer_id,
                appeal.response,
                appeal.reviewed_at,
            ),
            None => (None, None, None, None, None, None, None),
        };

        Self {
            id: Set(sanction.id),
            subject_id: Set(sanction.subject_id),
            subject_type: Set(sanction.subject_type.into()),
            service_id: Set(sanction.service_id),
            sanction_type: Set(sanction.sanction_type.into()),
            severity: Set(sanction.severity.into()),
            restricted_features: Set(serde_json::json!(sanction.restricted_features)),
            reason: Set(sanction.reason),
            internal_note: Set(sanction.internal_note),
            evidence_urls: Set(serde_json::json!(sanction.evidence_urls)),
            issuer_id: Set(sanction.issuer_id),
            issuer_type: Set(sanction.issuer_type.into()),
            start_at: Set(sanction.start_at),
            end_at: Set(sanction.end_at),
            status: Set(sanction.status.into()),
            revoked_by: Set(sanction.revoked_by),
            revoke_reason: Set(sanction.revoke_reason),
            appeal_status: Set(appeal_status),
            appeal_reason: Set(appeal_reason),
            appeal_evidence_urls: Set(appeal_evidence_urls),
            appeal_submitted_at: Set(appeal_submitted_at),
            appeal_reviewer_id: Set(appeal_reviewer_id),
            appeal_response: Set(appeal_response),
            appeal_reviewed_at: Set(appeal_reviewed_at),
            created_at: Set(sanction.created_at),
            updated_at: Set(sanction.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_domain_roundtrip() {
        let sanction = domain::Sanction::new(
            Uuid::new_v4(),
            domain::SubjectType::Account,
            None,
            domain::SanctionType::FeatureRestriction,
            domain::SanctionSeverity::Medium,
            "spam".to_string(),
            Uuid::new_v4(),
            domain::SubjectType::Operator,
            Utc::now(),
            None,
        )
        .unwrap();

        let active: ActiveModel = sanction.clone().into();
        match active.reason {
            Set(reason) => assert_eq!(reason, "spam"),
            _ => panic!("Expected Set value"),
        }
    }

    #[test]
    fn test_into_domain_parses_json() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            subject_type: SubjectType::Account,
            service_id: None,
            sanction_type: SanctionType::FeatureRestriction,
            severity: SanctionSeverity::Low,
            restricted_features: serde_json::json!(["chat"]),
            reason: "spam".to_string(),
            internal_note: None,
            evidence_urls: serde_json::json!([]),
            issuer_id: Uuid::new_v4(),
            issuer_type: SubjectType::Operator,
            start_at: now,
            end_at: None,
            status: SanctionStatus::Active,
            revoked_by: None,
            revoke_reason: None,
            appeal_status: None,
            appeal_reason: None,
            appeal_evidence_urls: None,
            appeal_submitted_at: None,
            appeal_reviewer_id: None,
            appeal_response: None,
            appeal_reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        let sanction = model.into_domain().unwrap();
        assert_eq!(sanction.restricted_features, vec!["chat".to_string()]);
        assert!(sanction.appeal.is_none());
    }
}
