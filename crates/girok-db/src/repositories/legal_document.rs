//! Legal document repository
//!
//! Resolution matches the active, unexpired document with the greatest
//! `effective_date <= now` for the exact locale/country/service shape;
//! the fallback ladder lives in the legal service. The version cut
//! (deactivate-then-insert) runs inside one SERIALIZABLE transaction
//! driven by the service.

use crate::entities::legal_document::{ActiveModel, Column, Entity};
use crate::error::{DbError, DbResult};
use chrono::Utc;
use girok_core::entities::legal::{ConsentType, LegalDocument};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Legal document repository
#[derive(Clone)]
pub struct LegalDocumentRepository {
    db: Arc<DatabaseConnection>,
}

impl LegalDocumentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert inside the caller's transaction
    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        document: LegalDocument,
    ) -> DbResult<LegalDocument> {
        let active: ActiveModel = document.into();
        let model = active.insert(conn).await.map_err(DbError::from)?;
        info!(document_id = %model.id, "legal document created");
        model.into_domain()
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<LegalDocument>> {
        match Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)?
        {
            Some(model) => Ok(Some(model.into_domain()?)),
            None => Ok(None),
        }
    }

    /// The latest effective document for one exact scope shape
    ///
    /// `country`/`service` of `None` match rows with NULL in that
    /// column; provided values match equal rows only.
    pub async fn latest_match(
        &self,
        doc_type: ConsentType,
        locale: &str,
        country: Option<&str>,
        service_id: Option<Uuid>,
    ) -> DbResult<Option<LegalDocument>> {
        let now = Utc::now();

        let mut query = Entity::find()
            .filter(Column::DocType.eq(doc_type.as_str()))
            .filter(Column::Locale.eq(locale))
            .filter(Column::IsActive.eq(true))
            .filter(Column::EffectiveDate.lte(now))
            .filter(
                sea_orm::Condition::any()
                    .add(Column::ExpiresAt.is_null())
                    .add(Column::ExpiresAt.gt(now)),
            );

        query = match country {
            Some(code) => query.filter(Column::Country.eq(code)),
            None => query.filter(Column::Country.is_null()),
        };
        query = match service_id {
            Some(id) => query.filter(Column::ServiceId.eq(id)),
            None => query.filter(Column::ServiceId.is_null()),
        };

        match query
            .order_by_desc(Column::EffectiveDate)
            .limit(1)
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)?
        {
            Some(model) => Ok(Some(model.into_domain()?)),
            None => Ok(None),
        }
    }

    /// Deactivate every prior version of `(doc_type, locale)` inside the
    /// caller's transaction; returns the number of rows flipped
    pub async fn deactivate_versions<C: ConnectionTrait>(
        &self,
        conn: &C,
        doc_type: ConsentType,
        locale: &str,
    ) -> DbResult<u64> {
        let result = Entity::update_many()
            .filter(Column::DocType.eq(doc_type.as_str()))
            .filter(Column::Locale.eq(locale))
            .filter(Column::IsActive.eq(true))
            .col_expr(Column::IsActive, sea_orm::sea_query::Expr::value(false))
            .exec(conn)
            .await
            .map_err(DbError::from)?;

        Ok(result.rows_affected)
    }

    /// Version history for one `(doc_type, locale)`
    pub async fn list_versions(
        &self,
        doc_type: ConsentType,
        locale: &str,
    ) -> DbResult<Vec<LegalDocument>> {
        let models = Entity::find()
            .filter(Column::DocType.eq(doc_type.as_str()))
            .filter(Column::Locale.eq(locale))
            .order_by_desc(Column::EffectiveDate)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        let mut documents = Vec::with_capacity(models.len());
        for model in models {
            documents.push(model.into_domain()?);
        }
        Ok(documents)
    }
}
