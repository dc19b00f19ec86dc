//! MFA secret entity model for SeaORM
//!
//! TOTP secret plus the hashed backup-code set, rotated atomically on
//! regenerate. Disabling MFA deletes the row outright.

use super::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "mfa_secrets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub account_id: Uuid,

    /// Base32-encoded TOTP secret
    pub secret: String,

    /// JSON array of SHA-256 backup-code digests
    #[sea_orm(column_type = "JsonBinary")]
    pub backup_code_hashes: Json,

    /// False while provisioned but not yet verified
    pub enabled: bool,

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
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the stored digest list
    pub fn hashes(&self) -> Vec<String> {
        serde_json::from_value(self.backup_code_hashes.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashes_parse() {
        let model = Model {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            backup_code_hashes: serde_json::json!(["aa", "bb"]),
            enabled: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert_eq!(model.hashes(), vec!["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn test_hashes_tolerates_garbage() {
        let model = Model {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            backup_code_hashes: serde_json::json!({"not": "a list"}),
            enabled: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        assert!(model.hashes().is_empty());
    }
}
