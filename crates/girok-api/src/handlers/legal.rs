//! Legal document and law registry handlers

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use girok_core::entities::legal::ConsentType;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth::require_operator_id;
use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::services::legal::NewDocumentVersion;
use crate::state::AppState;

// Request DTOs

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestQuery {
    #[serde(rename = "type")]
    pub doc_type: ConsentType,
    pub locale: Option<String>,
    pub country: Option<String>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionRequest {
    #[validate(length(min = 1, max = 20, message = "Version must be 1 to 20 characters"))]
    pub version: String,
    pub country: Option<String>,
    pub service_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,
    pub summary: Option<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RequirementsQuery {
    pub country: String,
}

// Handler functions

/// GET /api/v1/legal/documents/latest
pub async fn latest_document(
    data: web::Data<AppState>,
    query: web::Query<LatestQuery>,
) -> ApiResult<HttpResponse> {
    let locale = query.locale.as_deref().unwrap_or("en");
    let document = data
        .legal()
        .latest(
            query.doc_type,
            locale,
            query.country.as_deref(),
            query.service_id,
        )
        .await?;
    Ok(HttpResponse::Ok().json(document))
}

/// GET /api/v1/legal/documents/{id}
pub async fn get_document(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let document = data.legal().get_document(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(document))
}

/// GET /api/v1/legal/documents/{type}/{locale}/versions
pub async fn list_versions(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (doc_type_raw, locale) = path.into_inner();
    let doc_type = parse_doc_type(&doc_type_raw)?;

    let versions = data.legal().list_versions(doc_type, &locale).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": versions })))
}

/// POST /api/v1/legal/documents/{type}/{locale}/versions
///
/// Cuts a new version: all prior versions of the pair deactivate and
/// the new one becomes latest, atomically.
pub async fn create_version(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    request: web::Json<CreateVersionRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    require_operator_id(&http_request)?;

    let (doc_type_raw, locale) = path.into_inner();
    let doc_type = parse_doc_type(&doc_type_raw)?;

    let input = NewDocumentVersion {
        version: request.version.clone(),
        country: request.country.clone(),
        service_id: request.service_id,
        title: request.title.clone(),
        body: request.body.clone(),
        summary: request.summary.clone(),
        effective_date: request.effective_date,
        expires_at: request.expires_at,
    };

    let document = data.legal().create_version(doc_type, &locale, input).await?;
    Ok(HttpResponse::Created().json(document))
}

/// GET /api/v1/legal/laws
pub async fn list_laws(data: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let laws = data.legal().list_laws().await?;
    Ok(HttpResponse::Ok().json(json!({ "data": laws })))
}

/// GET /api/v1/legal/laws/{code}
pub async fn get_law(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let law = data.legal().get_law(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(law))
}

/// GET /api/v1/legal/requirements?country=KR
pub async fn consent_requirements(
    data: web::Data<AppState>,
    query: web::Query<RequirementsQuery>,
) -> ApiResult<HttpResponse> {
    let country = query.country.trim().to_uppercase();
    if country.is_empty() {
        return Err(ApiError::InvalidInput("country is required".to_string()));
    }

    let requirements = data
        .legal()
        .consent_requirements_for_country(&country)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "country": country,
        "requirements": requirements,
    })))
}

fn parse_doc_type(raw: &str) -> ApiResult<ConsentType> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| ApiError::InvalidInput(format!("unknown document type {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_doc_type() {
        assert_eq!(
            parse_doc_type("TERMS_OF_SERVICE").unwrap(),
            ConsentType::TermsOfService
        );
        assert_eq!(
            parse_doc_type("privacy_policy").unwrap(),
            ConsentType::PrivacyPolicy
        );
        assert!(parse_doc_type("NOT_A_TYPE").is_err());
    }

    #[test]
    fn test_create_version_validation() {
        let valid = CreateVersionRequest {
            version: "2.0".to_string(),
            country: None,
            service_id: None,
            title: "Terms of Service".to_string(),
            body: "...".to_string(),
            summary: None,
            effective_date: None,
            expires_at: None,
        };
        assert!(valid.validate().is_ok());

        let empty_body = CreateVersionRequest {
            body: String::new(),
            ..valid
        };
        assert!(empty_body.validate().is_err());
    }

    #[test]
    fn test_latest_query_parses_type() {
        let query: LatestQuery = serde_json::from_value(json!({
            "type": "PRIVACY_POLICY",
            "locale": "ko",
            "country": "KR",
        }))
        .unwrap();
        assert_eq!(query.doc_type, ConsentType::PrivacyPolicy);
        assert_eq!(query.locale.as_deref(), Some("ko"));
    }
}
