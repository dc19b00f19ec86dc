//! Session entity model for SeaORM

use super::*;
use girok_core::entities::session as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub account_id: Uuid,

    /// SHA-256 digest of the opaque refresh token; the token itself is
    /// never stored
    #[sea_orm(unique)]
    pub refresh_token_hash: String,

    pub device_fingerprint: Option<String>,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub context: SessionContext,

    pub mfa_verified: bool,

    pub mfa_required: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub last_activity_at: chrono::DateTime<chrono::Utc>,

    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Session context enum for database storage
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum SessionContext {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "OPERATOR")]
    Operator,
}

impl From<domain::SessionContext> for SessionContext {
    fn from(context: domain::SessionContext) -> Self {
        match context {
            domain::SessionContext::User => SessionContext::User,
            domain::SessionContext::Operator => SessionContext::Operator,
        }
    }
}

impl From<SessionContext> for domain::SessionContext {
    fn from(context: SessionContext) -> Self {
        match context {
            SessionContext::User => domain::SessionContext::User,
            SessionContext::Operator => domain::SessionContext::Operator,
        }
    }
}

impl From<Model> for domain::Session {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            refresh_token_hash: model.refresh_token_hash,
            device_fingerprint: model.device_fingerprint,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            context: model.context.into(),
            mfa_verified: model.mfa_verified,
            mfa_required: model.mfa_required,
            created_at: model.created_at,
            last_activity_at: model.last_activity_at,
            expires_at: model.expires_at,
        }
    }
}

impl From<domain::Session> for ActiveModel {
    fn from(session: domain::Session) -> Self {
        Self {
            id: Set(session.id),
            account_id: Set(session.account_id),
            refresh_token_hash: Set(session.refresh_token_hash),
            device_fingerprint: Set(session.device_fingerprint),
            ip_address: Set(session.ip_address),
            user_agent: Set(session.user_agent),
            context: Set(session.context.into()),
            mfa_verified: Set(session.mfa_verified),
            mfa_required: Set(session.mfa_required),
            created_at: Set(session.created_at),
            last_activity_at: Set(session.last_activity_at),
            expires_at: Set(session.expires_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_conversion_roundtrip() {
        for context in [
            domain::SessionContext::User,
            domain::SessionContext::Operator,
        ] {
            let db: SessionContext = context.into();
            let back: domain::SessionContext = db.into();
            assert_eq!(context, back);
        }
    }
}
