//! Law entity model for SeaORM

use super::*;
use crate::error::{DbError, DbResult};
use girok_core::entities::legal as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "laws")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub code: String,

    pub name: String,

    pub jurisdiction: String,

    pub country: Option<String>,

    pub effective_from: chrono::NaiveDate,

    pub is_active: bool,

    /// Typed requirements payload; parsed into `LawRequirements` at the
    /// repository boundary
    #[sea_orm(column_type = "JsonBinary")]
    pub requirements: Json,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert to the domain entity, parsing the requirements payload
    pub fn into_domain(self) -> DbResult<domain::Law> {
        let requirements: domain::LawRequirements =
            serde_json::from_value(self.requirements).map_err(DbError::from)?;

        Ok(domain::Law {
            id: self.id,
            code: self.code,
            name: self.name,
            jurisdiction: self.jurisdiction,
            country: self.country,
            effective_from: self.effective_from,
            is_active: self.is_active,
            requirements,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<domain::Law> for ActiveModel {
    type Error = DbError;

    fn try_from(law: domain::Law) -> DbResult<Self> {
        Ok(Self {
            id: Set(law.id),
            code: Set(law.code),
            name: Set(law.name),
            jurisdiction: Set(law.jurisdiction),
            country: Set(law.country),
            effective_from: Set(law.effective_from),
            is_active: Set(law.is_active),
            requirements: Set(serde_json::to_value(&law.requirements)?),
            created_at: Set(law.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_roundtrip() {
        let law = girok_core::entities::legal::builtin_laws()
            .into_iter()
            .find(|l| l.code == "PIPA")
            .unwrap();
        let original = law.requirements.clone();

        let active = ActiveModel::try_from(law).unwrap();
        let requirements = match active.requirements {
            Set(value) => value,
            _ => panic!("Expected Set value"),
        };

        let parsed: domain::LawRequirements = serde_json::from_value(requirements).unwrap();
        assert_eq!(parsed, original);
    }
}
