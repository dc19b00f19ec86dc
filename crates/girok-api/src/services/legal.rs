//! Legal document and law registry service
//!
//! Document resolution with the locale/country/service fallback ladder,
//! the SERIALIZABLE version cut with bounded retries, law seeding, and
//! the per-country consent-requirement merge.

use chrono::{DateTime, Utc};
use girok_core::cache::{Cache, CacheKeys, CacheTtl, KEY_PREFIX};
use girok_core::entities::legal::{
    builtin_laws, merge_requirements, ConsentRequirement, ConsentType, Law, LegalDocument,
};
use girok_core::ids::uuid7;
use girok_db::repositories::{LawRepository, LegalDocumentRepository};
use sea_orm::{
    AccessMode, DatabaseConnection, IsolationLevel, TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::middleware::error_handler::{ApiError, ApiResult};

/// Serialization-conflict retry policy for the version cut
const RETRY_BASE_MS: u64 = 100;
const RETRY_FACTOR: u64 = 2;
const RETRY_CAP_MS: u64 = 3_000;
const MAX_RETRIES: usize = 3;

fn requirements_key(country: &str) -> String {
    format!("{KEY_PREFIX}:law:requirements:{country}")
}

/// Input for a new document version
#[derive(Debug, Clone)]
pub struct NewDocumentVersion {
    pub version: String,
    pub country: Option<String>,
    pub service_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Legal service
#[derive(Clone)]
pub struct LegalService {
    db: Arc<DatabaseConnection>,
    documents: LegalDocumentRepository,
    laws: LawRepository,
    cache: Cache,
}

impl LegalService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        documents: LegalDocumentRepository,
        laws: LawRepository,
        cache: Cache,
    ) -> Self {
        Self {
            db,
            documents,
            laws,
            cache,
        }
    }

    /// Resolve the latest active document
    ///
    /// Exact scope first, then the fallback ladder: English locale,
    /// then the country/service-agnostic base document. Not finding
    /// anything is a hard error.
    pub async fn latest(
        &self,
        doc_type: ConsentType,
        locale: &str,
        country: Option<&str>,
        service_id: Option<Uuid>,
    ) -> ApiResult<LegalDocument> {
        // The base (no country/service) resolution is the hot path and
        // reads through the cache; scoped lookups go to the store.
        if country.is_none() && service_id.is_none() {
            return self.latest_base_cached(doc_type, locale).await;
        }

        let mut attempts: Vec<(String, Option<&str>, Option<Uuid>)> = vec![
            (locale.to_string(), country, service_id),
            ("en".to_string(), country, service_id),
            (locale.to_string(), None, None),
            ("en".to_string(), None, None),
        ];
        attempts.dedup();

        for (candidate_locale, candidate_country, candidate_service) in attempts {
            if let Some(document) = self
                .documents
                .latest_match(doc_type, &candidate_locale, candidate_country, candidate_service)
                .await?
            {
                return Ok(document);
            }
        }

        Err(ApiError::NotFound(format!(
            "no active {} document for locale {locale}",
            doc_type.as_str()
        )))
    }

    async fn latest_base_cached(
        &self,
        doc_type: ConsentType,
        locale: &str,
    ) -> ApiResult<LegalDocument> {
        let key = CacheKeys::doc_latest(doc_type.as_str(), locale);
        let documents = self.documents.clone();
        let locale_owned = locale.to_string();

        let found: Option<LegalDocument> = self
            .cache
            .get_or_compute(&key, CacheTtl::SEMI_STATIC, || async move {
                let direct = documents
                    .latest_match(doc_type, &locale_owned, None, None)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))?;
                if direct.is_some() || locale_owned == "en" {
                    return Ok(direct);
                }
                documents
                    .latest_match(doc_type, "en", None, None)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))
            })
            .await?;

        found.ok_or_else(|| {
            ApiError::NotFound(format!(
                "no active {} document for locale {locale}",
                doc_type.as_str()
            ))
        })
    }

    /// Cut a new version: deactivate all prior `(doc_type, locale)`
    /// rows and insert the new active version in one SERIALIZABLE
    /// transaction, retried on serialization conflicts
    pub async fn create_version(
        &self,
        doc_type: ConsentType,
        locale: &str,
        input: NewDocumentVersion,
    ) -> ApiResult<LegalDocument> {
        let mut delay_ms = RETRY_BASE_MS;
        let mut last_error: Option<girok_db::DbError> = None;

        for attempt in 0..=MAX_RETRIES {
            match self.try_create_version(doc_type, locale, &input).await {
                Ok(document) => {
                    self.invalidate_latest(doc_type);
                    info!(
                        document_id = %document.id,
                        doc_type = doc_type.as_str(),
                        locale,
                        version = %document.version,
                        "document version cut"
                    );
                    return Ok(document);
                }
                Err(e) if e.is_serialization_conflict() && attempt < MAX_RETRIES => {
                    warn!(attempt, delay_ms, "version cut serialization conflict, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * RETRY_FACTOR).min(RETRY_CAP_MS);
                    last_error = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_error
            .map(ApiError::from)
            .unwrap_or_else(|| ApiError::Internal("version cut retries exhausted".to_string())))
    }

    async fn try_create_version(
        &self,
        doc_type: ConsentType,
        locale: &str,
        input: &NewDocumentVersion,
    ) -> Result<LegalDocument, girok_db::DbError> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), Some(AccessMode::ReadWrite))
            .await
            .map_err(girok_db::DbError::from)?;

        let deactivated = self
            .documents
            .deactivate_versions(&txn, doc_type, locale)
            .await?;

        let document = LegalDocument {
            id: uuid7::generate(),
            doc_type,
            version: input.version.clone(),
            locale: locale.to_string(),
            service_id: input.service_id,
            country: input.country.clone(),
            title: input.title.clone(),
            body: input.body.clone(),
            summary: input.summary.clone(),
            effective_date: input.effective_date.unwrap_or_else(Utc::now),
            expires_at: input.expires_at,
            is_active: true,
            created_at: Utc::now(),
        };
        let document = self.documents.insert(&txn, document).await?;

        txn.commit().await.map_err(girok_db::DbError::from)?;
        debug!(deactivated, "prior versions deactivated");
        Ok(document)
    }

    pub async fn get_document(&self, id: Uuid) -> ApiResult<LegalDocument> {
        self.documents
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("legal document".to_string()))
    }

    pub async fn list_versions(
        &self,
        doc_type: ConsentType,
        locale: &str,
    ) -> ApiResult<Vec<LegalDocument>> {
        Ok(self.documents.list_versions(doc_type, locale).await?)
    }

    /// Seed the required system laws; idempotent across boots
    pub async fn seed_laws(&self) -> ApiResult<u64> {
        Ok(self.laws.seed(builtin_laws()).await?)
    }

    /// One law by code, read through the cache
    pub async fn get_law(&self, code: &str) -> ApiResult<Law> {
        let key = CacheKeys::law_code(code);
        let laws = self.laws.clone();
        let code_owned = code.to_string();

        let law: Option<Law> = self
            .cache
            .get_or_compute(&key, CacheTtl::STATIC_CONFIG, || async move {
                laws.find_by_code(&code_owned)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))
            })
            .await?;

        law.ok_or_else(|| ApiError::NotFound(format!("law {code}")))
    }

    pub async fn list_laws(&self) -> ApiResult<Vec<Law>> {
        Ok(self.laws.list_active().await?)
    }

    /// Merged consent requirements for a country: union over its active
    /// laws, `required` winning on conflict
    pub async fn consent_requirements_for_country(
        &self,
        country: &str,
    ) -> ApiResult<Vec<ConsentRequirement>> {
        let key = requirements_key(country);
        let laws = self.laws.clone();
        let country_owned = country.to_string();

        let requirements: Vec<ConsentRequirement> = self
            .cache
            .get_or_compute(&key, CacheTtl::STATIC_CONFIG, || async move {
                let applicable = laws
                    .list_for_country(&country_owned)
                    .await
                    .map_err(|e| girok_core::CoreError::internal(e.to_string()))?;
                Ok(merge_requirements(applicable.iter()))
            })
            .await?;

        Ok(requirements)
    }

    /// Drop cached latest-document entries for a type; runs off the
    /// request path since pattern invalidation must never block a
    /// response
    fn invalidate_latest(&self, doc_type: ConsentType) {
        let cache = self.cache.clone();
        let pattern = CacheKeys::doc_latest_pattern(doc_type.as_str());
        tokio::spawn(async move {
            match cache.invalidate_pattern(&pattern).await {
                Ok(removed) => debug!(pattern, removed, "latest-document cache invalidated"),
                Err(e) => warn!(pattern, error = %e, "latest-document cache invalidation failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_key_namespace() {
        assert_eq!(requirements_key("KR"), "girok:law:requirements:KR");
    }

    #[test]
    fn test_retry_policy_constants() {
        assert_eq!(RETRY_BASE_MS, 100);
        assert_eq!(RETRY_FACTOR, 2);
        assert_eq!(RETRY_CAP_MS, 3_000);
        assert_eq!(MAX_RETRIES, 3);
    }
}
