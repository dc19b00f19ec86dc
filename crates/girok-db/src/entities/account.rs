//! Account entity model for SeaORM

use super::*;
use girok_core::entities::account as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub external_id: String,

    #[sea_orm(unique)]
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

    pub locked_until: Option<chrono::DateTime<chrono::Utc>>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,

    #[sea_orm(has_many = "super::consent::Entity")]
    Consents,

    #[sea_orm(has_many = "super::dsr_request::Entity")]
    DsrRequests,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::consent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consents.def()
    }
}

impl Related<super::dsr_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DsrRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Credential kind enum for database storage
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum CredentialKind {
    #[sea_orm(string_value = "LOCAL")]
    Local,
    #[sea_orm(string_value = "OAUTH_GOOGLE")]
    OauthGoogle,
    #[sea_orm(string_value = "OAUTH_KAKAO")]
    OauthKakao,
    #[sea_orm(string_value = "OAUTH_APPLE")]
    OauthApple,
}

/// Account status enum for database storage
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum AccountStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "LOCKED")]
    Locked,
    #[sea_orm(string_value = "DORMANT")]
    Dormant,
    #[sea_orm(string_value = "DELETED")]
    Deleted,
}

/// Account mode enum for database storage
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum AccountMode {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "OPERATOR")]
    Operator,
    #[sea_orm(string_value = "SERVICE")]
    Service,
}

impl From<domain::CredentialKind> for CredentialKind {
    fn from(kind: domain::CredentialKind) -> Self {
        match kind {
            domain::CredentialKind::Local => CredentialKind::Local,
            domain::CredentialKind::OauthGoogle => CredentialKind::OauthGoogle,
            domain::CredentialKind::OauthKakao => CredentialKind::OauthKakao,
            domain::CredentialKind::OauthApple => CredentialKind::OauthApple,
        }
    }
}

impl From<CredentialKind> for domain::CredentialKind {
    fn from(kind: CredentialKind) -> Self {
        match kind {
            CredentialKind::Local => domain::CredentialKind::Local,
            CredentialKind::OauthGoogle => domain::CredentialKind::OauthGoogle,
            CredentialKind::OauthKakao => domain::CredentialKind::OauthKakao,
            CredentialKind::OauthApple => domain::CredentialKind::OauthApple,
        }
    }
}

impl From<domain::AccountStatus> for AccountStatus {
    fn from(status: domain::AccountStatus) -> Self {
        match status {
            domain::AccountStatus::Active => AccountStatus::Active,
            domain::AccountStatus::Locked => AccountStatus::Locked,
            domain::AccountStatus::Dormant => AccountStatus::Dormant,
            domain::AccountStatus::Deleted => AccountStatus::Deleted,
        }
    }
}

impl From<AccountStatus> for domain::AccountStatus {
    fn from(status: AccountStatus) -> Self {
        match status {
            AccountStatus::Active => domain::AccountStatus::Active,
            AccountStatus::Locked => domain::AccountStatus::Locked,
            AccountStatus::Dormant => domain::AccountStatus::Dormant,
            AccountStatus::Deleted => domain::AccountStatus::Deleted,
        }
    }
}

impl From<domain::AccountMode> for AccountMode {
    fn from(mode: domain::AccountMode) -> Self {
        match mode {
            domain::AccountMode::User => AccountMode::User,
            domain::AccountMode::Admin => AccountMode::Admin,
            domain::AccountMode::Operator => AccountMode::Operator,
            domain::AccountMode::Service => AccountMode::Service,
        }
    }
}

impl From<AccountMode> for domain::AccountMode {
    fn from(mode: AccountMode) -> Self {
        match mode {
            AccountMode::User => domain::AccountMode::User,
            AccountMode::Admin => domain::AccountMode::Admin,
            AccountMode::Operator => domain::AccountMode::Operator,
            AccountMode::Service => domain::AccountMode::Service,
        }
    }
}

impl From<Model> for domain::Account {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            email: model.email,
            username: model.username,
            credential_kind: model.credential_kind.into(),
            status: model.status.into(),
            mode: model.mode.into(),
            mfa_enabled: model.mfa_enabled,
            email_verified: model.email_verified,
            country: model.country,
            locale: model.locale,
            timezone: model.timezone,
            locked_until: model.locked_until,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<domain::Account> for ActiveModel {
    fn from(account: domain::Account) -> Self {
        Self {
            id: Set(account.id),
            external_id: Set(account.external_id),
            email: Set(account.email),
            username: Set(account.username),
            credential_kind: Set(account.credential_kind.into()),
            status: Set(account.status.into()),
            mode: Set(account.mode.into()),
            mfa_enabled: Set(account.mfa_enabled),
            email_verified: Set(account.email_verified),
            country: Set(account.country),
            locale: Set(account.locale),
            timezone: Set(account.timezone),
            locked_until: Set(account.locked_until),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion_roundtrip() {
        for status in [
            domain::AccountStatus::Active,
            domain::AccountStatus::Locked,
            domain::AccountStatus::Dormant,
            domain::AccountStatus::Deleted,
        ] {
            let db: AccountStatus = status.into();
            let back: domain::AccountStatus = db.into();
            assert_eq!(status, back);
        }
    }

    #[test]
    fn test_model_conversion_roundtrip() {
        let account =
            domain::Account::new("alice@example.com".to_string(), "alice".to_string());

        let active: ActiveModel = account.clone().into();
        match active.email {
            Set(email) => assert_eq!(email, account.email),
            _ => panic!("Expected Set value"),
        }
    }
}
