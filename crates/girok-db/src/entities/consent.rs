//! Consent entity model for SeaORM

use super::*;
use girok_core::entities::consent as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "consents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub account_id: Uuid,

    pub document_id: Uuid,

    pub status: ConsentStatus,

    pub granted_at: chrono::DateTime<chrono::Utc>,

    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,

    pub withdrawn_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,

    #[sea_orm(
        belongs_to = "super::legal_document::Entity",
        from = "Column::DocumentId",
        to = "super::legal_document::Column::Id"
    )]
    Document,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::legal_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Consent status enum for database storage
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum ConsentStatus {
    #[sea_orm(string_value = "GRANTED")]
    Granted,
    #[sea_orm(string_value = "WITHDRAWN")]
    Withdrawn,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
}

impl From<domain::ConsentStatus> for ConsentStatus {
    fn from(status: domain::ConsentStatus) -> Self {
        match status {
            domain::ConsentStatus::Granted => ConsentStatus::Granted,
            domain::ConsentStatus::Withdrawn => ConsentStatus::Withdrawn,
            domain::ConsentStatus::Expired => ConsentStatus::Expired,
        }
    }
}

impl From<ConsentStatus> for domain::ConsentStatus {
    fn from(status: ConsentStatus) -> Self {
        match status {
            ConsentStatus::Granted => domain::ConsentStatus::Granted,
            ConsentStatus::Withdrawn => domain::ConsentStatus::Withdrawn,
            ConsentStatus::Expired => domain::ConsentStatus::Expired,
        }
    }
}

impl From<Model> for domain::Consent {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            document_id: model.document_id,
            status: model.status.into(),
            granted_at: model.granted_at,
            expires_at: model.expires_at,
            withdrawn_at: model.withdrawn_at,
        }
    }
}

impl From<domain::Consent> for ActiveModel {
    fn from(consent: domain::Consent) -> Self {
        Self {
            id: Set(consent.id),
            account_id: Set(consent.account_id),
            document_id: Set(consent.document_id),
            status: Set(consent.status.into()),
            granted_at: Set(consent.granted_at),
            expires_at: Set(consent.expires_at),
            withdrawn_at: Set(consent.withdrawn_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion_roundtrip() {
        for status in [
            domain::ConsentStatus::Granted,
            domain::ConsentStatus::Withdrawn,
            domain::ConsentStatus::Expired,
        ] {
            let db: ConsentStatus = status.into();
            let back: domain::ConsentStatus = db.into();
            assert_eq!(status, back);
        }
    }
}
