//! Legal document entity model for SeaORM

use super::*;
use crate::error::{DbError, DbResult};
use girok_core::entities::legal as domain;
use sea_orm::ActiveValue::Set;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "legal_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Consent-taxonomy token, e.g. `TERMS_OF_SERVICE`
    pub doc_type: String,

    pub version: String,

    pub locale: String,

    pub service_id: Option<Uuid>,

    pub country: Option<String>,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub summary: Option<String>,

    pub effective_date: chrono::DateTime<chrono::Utc>,

    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,

    pub is_active: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::consent::Entity")]
    Consents,
}

impl Related<super::consent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Convert to the domain entity, parsing the taxonomy token
    pub fn into_domain(self) -> DbResult<domain::LegalDocument> {
        let doc_type: domain::ConsentType =
            serde_json::from_value(serde_json::Value::String(self.doc_type.clone()))
                .map_err(|_| {
                    DbError::Serialization(format!("unknown document type {}", self.doc_type))
                })?;

        Ok(domain::LegalDocument {
            id: self.id,
            doc_type,
            version: self.version,
            locale: self.locale,
            service_id: self.service_id,
            country: self.country,
            title: self.title,
            body: self.body,
            summary: self.summary,
            effective_date: self.effective_date,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_at: self.created_at,
        })
    }
}

impl From<domain::LegalDocument> for ActiveModel {
    fn from(doc: domain::LegalDocument) -> Self {
        Self {
            id: Set(doc.id),
            doc_type: Set(doc.doc_type.as_str().to_string()),
            version: Set(doc.version),
            locale: Set(doc.locale),
            service_id: Set(doc.service_id),
            country: Set(doc.country),
            title: Set(doc.title),
            body: Set(doc.body),
            summary: Set(doc.summary),
            effective_date: Set(doc.effective_date),
            expires_at: Set(doc.expires_at),
            is_active: Set(doc.is_active),
            created_at: Set(doc.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_doc_type_parse() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            doc_type: "TERMS_OF_SERVICE".to_string(),
            version: "1.0".to_string(),
            locale: "en".to_string(),
            service_id: None,
            country: None,
            title: "Terms".to_string(),
            body: "...".to_string(),
            summary: None,
            effective_date: now,
            expires_at: None,
            is_active: true,
            created_at: now,
        };

        let doc = model.into_domain().unwrap();
        assert_eq!(doc.doc_type, domain::ConsentType::TermsOfService);
    }

    #[test]
    fn test_unknown_doc_type_is_an_error() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            doc_type: "NOT_A_TYPE".to_string(),
            version: "1.0".to_string(),
            locale: "en".to_string(),
            service_id: None,
            country: None,
            title: "Terms".to_string(),
            body: "...".to_string(),
            summary: None,
            effective_date: now,
            expires_at: None,
            is_active: true,
            created_at: now,
        };

        assert!(model.into_domain().is_err());
    }
}
