//! DSR request entity model for SeaORM

use super::*;
use crate::error::{DbError, DbResult};
use girok_core::entities::dsr as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dsr_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub account_id: Uuid,

    pub request_type: DsrType,

    pub status: DsrStatus,

    pub priority: DsrPriority,

    /// Typed scope payload; parsed into `DsrScope` at the boundary
    #[sea_orm(column_type = "JsonBinary")]
    pub scope: Json,

    pub legal_basis: LegalBasis,

    pub deadline: chrono::DateTime<chrono::Utc>,

    pub extended_deadline: Option<chrono::DateTime<chrono::Utc>>,

    pub extension_reason: Option<String>,

    pub escalation_level: EscalationLevel,

    pub escalated_at: Option<chrono::DateTime<chrono::Utc>>,

    pub assigned_to: Option<Uuid>,

    pub processed_by: Option<Uuid>,

    pub response_type: Option<DsrResponseType>,

    #[sea_orm(column_type = "Text", nullable)]
    pub response_body: Option<String>,

    pub response_note: Option<String>,

    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,

    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,

    #[sea_orm(has_many = "super::dsr_request_log::Entity")]
    Logs,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::dsr_request_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum DsrType {
    #[sea_orm(string_value = "ACCESS")]
    Access,
    #[sea_orm(string_value = "ERASURE")]
    Erasure,
    #[sea_orm(string_value = "PORTABILITY")]
    Portability,
    #[sea_orm(string_value = "RECTIFICATION")]
    Rectification,
    #[sea_orm(string_value = "RESTRICTION")]
    Restriction,
    #[sea_orm(string_value = "OBJECTION")]
    Objection,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum DsrStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "VERIFIED")]
    Verified,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "AWAITING_INFO")]
    AwaitingInfo,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum DsrPriority {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[sea_orm(string_value = "NORMAL")]
    Normal,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "URGENT")]
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum LegalBasis {
    #[sea_orm(string_value = "GDPR")]
    Gdpr,
    #[sea_orm(string_value = "CCPA")]
    Ccpa,
    #[sea_orm(string_value = "PIPA")]
    Pipa,
    #[sea_orm(string_value = "APPI")]
    Appi,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum EscalationLevel {
    #[sea_orm(string_value = "NONE")]
    None,
    #[sea_orm(string_value = "WARNING")]
    Warning,
    #[sea_orm(string_value = "CRITICAL")]
    Critical,
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum DsrResponseType {
    #[sea_orm(string_value = "DATA")]
    Data,
    #[sea_orm(string_value = "CONFIRMATION")]
    Confirmation,
    #[sea_orm(string_value = "DENIAL")]
    Denial,
}

impl From<domain::DsrType> for DsrType {
    fn from(value: domain::DsrType) -> Self {
        match value {
            domain::DsrType::Access => DsrType::Access,
            domain::DsrType::Erasure => DsrType::Erasure,
            domain::DsrType::Portability => DsrType::Portability,
            domain::DsrType::Rectification => DsrType::Rectification,
            domain::DsrType::Restriction => DsrType::Restriction,
            domain::DsrType::Objection => DsrType::Objection,
        }
    }
}

impl From<DsrType> for domain::DsrType {
    fn from(value: DsrType) -> Self {
        match value {
            DsrType::Access => domain::DsrType::Access,
            DsrType::Erasure => domain::DsrType::Erasure,
            DsrType::Portability => domain::DsrType::Portability,
            DsrType::Rectification => domain::DsrType::Rectification,
            DsrType::Restriction => domain::DsrType::Restriction,
            DsrType::Objection => domain::DsrType::Objection,
        }
    }
}

impl From<domain::DsrStatus> for DsrStatus {
    fn from(value: domain::DsrStatus) -> Self {
        match value {
            domain::DsrStatus::Pending => DsrStatus::Pending,
            domain::DsrStatus::Verified => DsrStatus::Verified,
            domain::DsrStatus::InProgress => DsrStatus::InProgress,
            domain::DsrStatus::AwaitingInfo => DsrStatus::AwaitingInfo,
            domain::DsrStatus::Completed => DsrStatus::Completed,
            domain::DsrStatus::Rejected => DsrStatus::Rejected,
            domain::DsrStatus::Cancelled => DsrStatus::Cancelled,
        }
    }
}

impl From<DsrStatus> for domain::DsrStatus {
    fn from(value: DsrStatus) -> Self {
        match value {
            DsrStatus::Pending => domain::DsrStatus::Pending,
            DsrStatus::Verified => domain::DsrStatus::Verified,
            DsrStatus::InProgress => domain::DsrStatus::InProgress,
            DsrStatus::AwaitingInfo => domain::DsrStatus::AwaitingInfo,
            DsrStatus::Completed => domain::DsrStatus::Completed,
            DsrStatus::Rejected => domain::DsrStatus::Rejected,
            DsrStatus::Cancelled => domain::DsrStatus::Cancelled,
        }
    }
}

impl From<domain::DsrPriority> for DsrPriority {
    fn from(value: domain::DsrPriority) -> Self {
        match value {
            domain::DsrPriority::Low => DsrPriority::Low,
            domain::DsrPriority::Normal => DsrPriority::Normal,
            domain::DsrPriority::High => DsrPriority::High,
            domain::DsrPriority::Urgent => DsrPriority::Urgent,
        }
    }
}

impl From<DsrPriority> for domain::DsrPriority {
    fn from(value: DsrPriority) -> Self {
        match value {
            DsrPriority::Low => domain::DsrPriority::Low,
            DsrPriority::Normal => domain::DsrPriority::Normal,
            DsrPriority::High => domain::DsrPriority::High,
            DsrPriority::Urgent => domain::DsrPriority::Urgent,
        }
    }
}

impl From<domain::LegalBasis> for LegalBasis {
    fn from(value: domain::LegalBasis) -> Self {
        match value {
            domain::LegalBasis::Gdpr => LegalBasis::Gdpr,
            domain::LegalBasis::Ccpa => LegalBasis::Ccpa,
            domain::LegalBasis::Pipa => LegalBasis::Pipa,
            domain::LegalBasis::Appi => LegalBasis::Appi,
            domain::LegalBasis::Other => LegalBasis::Other,
        }
    }
}

impl From<LegalBasis> for domain::LegalBasis {
    fn from(value: LegalBasis) -> Self {
        match value {
            LegalBasis::Gdpr => domain::LegalBasis::Gdpr,
            LegalBasis::Ccpa => domain::LegalBasis::Ccpa,
            LegalBasis::Pipa => domain::LegalBasis::Pipa,
            LegalBasis::Appi => domain::LegalBasis::Appi,
            LegalBasis::Other => domain::LegalBasis::Other,
        }
    }
}

impl From<domain::EscalationLevel> for EscalationLevel {
    fn from(value: domain::EscalationLevel) -> Self {
        match value {
            domain::EscalationLevel::None => EscalationLevel::None,
            domain::EscalationLevel::Warning => EscalationLevel::Warning,
            domain::EscalationLevel::Critical => EscalationLevel::Critical,
            domain::EscalationLevel::Overdue => EscalationLevel::Overdue,
        }
    }
}

impl From<EscalationLevel> for domain::EscalationLevel {
    fn from(value: EscalationLevel) -> Self {
        match value {
            EscalationLevel::None => domain::EscalationLevel::None,
            EscalationLevel::Warning => domain::EscalationLevel::Warning,
            EscalationLevel::Critical => domain::EscalationLevel::Critical,
            EscalationLevel::Overdue => domain::EscalationLevel::Overdue,
        }
    }
}

impl From<domain::DsrResponseType> for DsrResponseType {
    fn from(value: domain::DsrResponseType) -> Self {
        match value {
            domain::DsrResponseType::Data => DsrResponseType::Data,
            domain::DsrResponseType::Confirmation => DsrResponseType::Confirmation,
            domain::DsrResponseType::Denial => DsrResponseType::Denial,
        }
    }
}

impl From<DsrResponseType> for domain::DsrResponseType {
    fn from(value: DsrResponseType) -> Self {
        match value {
            DsrResponseType::Data => domain::DsrResponseType::Data,
            DsrResponseType::Confirmation => domain::DsrResponseType::Confirmation,
            DsrResponseType::Denial => domain::DsrResponseType::Denial,
        }
    }
}

impl Model {
    /// Convert to the domain entity, parsing the scope payload
    pub fn into_domain(self) -> DbResult<domain::DsrRequest> {
        let scope: domain::DsrScope =
            serde_json::from_value(self.scope).map_err(DbError::from)?;

        Ok(domain::DsrRequest {
            id: self.id,
            account_id: self.account_id,
            request_type: self.request_type.into(),
            status: self.status.into(),
            priority: self.priority.into(),
            scope,
            legal_basis: self.legal_basis.into(),
            deadline: self.deadline,
            extended_deadline: self.extended_deadline,
            extension_reason: self.extension_reason,
            escalation_level: self.escalation_level.into(),
            escalated_at: self.escalated_at,
            assigned_to: self.assigned_to,
            processed_by: self.processed_by,
            response_type: self.response_type.map(Into::into),
            response_body: self.response_body,
            response_note: self.response_note,
            verified_at: self.verified_at,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<domain::DsrRequest> for ActiveModel {
    type Error = DbError;

    fn try_from(request: domain::DsrRequest) -> DbResult<Self> {
        Ok(Self {
            id: Set(request.id),
            account_id: Set(request.account_id),
            request_type: Set(request.request_type.into()),
            status: Set(request.status.into()),
            priority: Set(request.priority.into()),
            scope: Set(serde_json::to_value(&request.scope)?),
            legal_basis: Set(request.legal_basis.into()),
            deadline: Set(request.deadline),
            extended_deadline: Set(request.extended_deadline),
            extension_reason: Set(request.extension_reason),
            escalation_level: Set(request.escalation_level.into()),
            escalated_at: Set(request.escalated_at),
            assigned_to: Set(request.assigned_to),
            processed_by: Set(request.processed_by),
            response_type: Set(request.response_type.map(Into::into)),
            response_body: Set(request.response_body),
            response_note: Set(request.response_note),
            verified_at: Set(request.verified_at),
            completed_at: Set(request.completed_at),
            created_at: Set(request.created_at),
            updated_at: Set(request.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_roundtrip() {
        let request = domain::DsrRequest::submit(
            Uuid::new_v4(),
            domain::DsrType::Erasure,
            domain::LegalBasis::Gdpr,
            domain::DsrScope {
                data_categories: vec!["profile".to_string()],
                ..Default::default()
            },
            domain::DsrPriority::High,
        );

        let active = ActiveModel::try_from(request.clone()).unwrap();
        let scope = match active.scope {
            Set(value) => value,
            _ => panic!("Expected Set value"),
        };
        let parsed: domain::DsrScope = serde_json::from_value(scope).unwrap();
        assert_eq!(parsed, request.scope);
    }
}
