//! Law registry repository
//!
//! Laws with a NULL country are baseline regulations that apply to
//! every country; country-specific rows add to them.

use crate::entities::law::{ActiveModel, Column, Entity};
use crate::error::{DbError, DbResult};
use girok_core::entities::legal::Law;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use std::sync::Arc;
use tracing::info;

/// Law repository
#[derive(Clone)]
pub struct LawRepository {
    db: Arc<DatabaseConnection>,
}

impl LawRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn insert(&self, law: Law) -> DbResult<Law> {
        let active = ActiveModel::try_from(law)?;
        let model = active.insert(self.db.as_ref()).await.map_err(DbError::from)?;
        info!(code = %model.code, "law registered");
        model.into_domain()
    }

    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<Law>> {
        match Entity::find()
            .filter(Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(DbError::from)?
        {
            Some(model) => Ok(Some(model.into_domain()?)),
            None => Ok(None),
        }
    }

    pub async fn list_active(&self) -> DbResult<Vec<Law>> {
        let models = Entity::find()
            .filter(Column::IsActive.eq(true))
            .order_by_asc(Column::Code)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        let mut laws = Vec::with_capacity(models.len());
        for model in models {
            laws.push(model.into_domain()?);
        }
        Ok(laws)
    }

    /// Active laws governing a country: exact matches plus the
    /// country-agnostic baselines
    pub async fn list_for_country(&self, country: &str) -> DbResult<Vec<Law>> {
        let models = Entity::find()
            .filter(Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(Column::Country.eq(country))
                    .add(Column::Country.is_null()),
            )
            .order_by_asc(Column::Code)
            .all(self.db.as_ref())
            .await
            .map_err(DbError::from)?;

        let mut laws = Vec::with_capacity(models.len());
        for model in models {
            laws.push(model.into_domain()?);
        }
        Ok(laws)
    }

    /// Seed the registry; existing codes are left untouched, so repeat
    /// calls are no-ops
    pub async fn seed(&self, laws: Vec<Law>) -> DbResult<u64> {
        let mut inserted = 0;
        for law in laws {
            if self.find_by_code(&law.code).await?.is_none() {
                self.insert(law).await?;
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!(inserted, "seeded system laws");
        }
        Ok(inserted)
    }
}
