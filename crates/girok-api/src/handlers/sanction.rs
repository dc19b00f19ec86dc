//! Sanction handlers
//!
//! Operator lifecycle operations carry `X-Operator-Id`; appeal
//! submission carries `X-Subject-Id` and is limited to the sanctioned
//! subject.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use girok_core::entities::sanction::{
    AppealStatus, Sanction, SanctionSeverity, SanctionStatus, SanctionType, SubjectType,
};
use girok_db::repositories::SanctionFilter;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::ListResponse;
use crate::middleware::auth::{require_operator_id, require_subject_id};
use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::services::sanction::CreateSanction;
use crate::state::AppState;

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSanctionRequest {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub service_id: Option<Uuid>,
    pub sanction_type: SanctionType,
    pub severity: SanctionSeverity,
    #[serde(default)]
    pub restricted_features: Vec<String>,
    #[validate(length(min = 1, max = 1000, message = "Reason must be 1 to 1000 characters"))]
    pub reason: String,
    pub internal_note: Option<String>,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RevokeSanctionRequest {
    #[validate(length(min = 1, max = 1000, message = "Reason must be 1 to 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AmendSanctionRequest {
    pub end_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAppealRequest {
    #[validate(length(min = 1, max = 2000, message = "Reason must be 1 to 2000 characters"))]
    pub reason: String,
    #[serde(default)]
    pub evidence_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DecideAppealRequest {
    pub decision: AppealStatus,
    pub response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub subject_id: Option<Uuid>,
    pub subject_type: Option<SubjectType>,
    pub status: Option<SanctionStatus>,
    pub service_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveQuery {
    pub subject_id: Uuid,
    pub subject_type: SubjectType,
    pub service_id: Option<Uuid>,
}

// Handler functions

/// POST /api/v1/sanctions
pub async fn create(
    data: web::Data<AppState>,
    request: web::Json<CreateSanctionRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let operator_id = require_operator_id(&http_request)?;

    let input = CreateSanction {
        subject_id: request.subject_id,
        subject_type: request.subject_type,
        service_id: request.service_id,
        sanction_type: request.sanction_type,
        severity: request.severity,
        restricted_features: request.restricted_features.clone(),
        reason: request.reason.clone(),
        internal_note: request.internal_note.clone(),
        evidence_urls: request.evidence_urls.clone(),
        start_at: request.start_at,
        end_at: request.end_at,
    };

    let sanction = data.sanctions().create(input, operator_id).await?;
    Ok(HttpResponse::Created().json(sanction_body(&sanction)?))
}

/// GET /api/v1/sanctions
pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let filter = SanctionFilter {
        subject_id: query.subject_id,
        subject_type: query.subject_type,
        status: query.status,
        service_id: query.service_id,
        page,
        limit,
    };

    let (sanctions, total) = data.sanctions().list(&filter).await?;
    let data_rows = sanctions
        .iter()
        .map(sanction_body)
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(ListResponse::new(data_rows, total, page, limit)))
}

/// GET /api/v1/sanctions/active
pub async fn get_active(
    data: web::Data<AppState>,
    query: web::Query<ActiveQuery>,
) -> ApiResult<HttpResponse> {
    let active = data
        .sanctions()
        .get_active(query.subject_id, query.subject_type, query.service_id)
        .await?;
    Ok(HttpResponse::Ok().json(active))
}

/// GET /api/v1/sanctions/{id}
pub async fn get(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let sanction = data.sanctions().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(sanction_body(&sanction)?))
}

/// POST /api/v1/sanctions/{id}/revoke
pub async fn revoke(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<RevokeSanctionRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let operator_id = require_operator_id(&http_request)?;

    let sanction = data
        .sanctions()
        .revoke(path.into_inner(), operator_id, request.reason.clone())
        .await?;
    Ok(HttpResponse::Ok().json(sanction_body(&sanction)?))
}

/// POST /api/v1/sanctions/{id}/extend
pub async fn extend(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<AmendSanctionRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let sanction = data
        .sanctions()
        .extend(
            path.into_inner(),
            operator_id,
            request.end_at,
            request.reason.clone(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(sanction_body(&sanction)?))
}

/// POST /api/v1/sanctions/{id}/reduce
pub async fn reduce(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<AmendSanctionRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let sanction = data
        .sanctions()
        .reduce(
            path.into_inner(),
            operator_id,
            request.end_at,
            request.reason.clone(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(sanction_body(&sanction)?))
}

/// POST /api/v1/sanctions/{id}/appeal
pub async fn submit_appeal(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<SubmitAppealRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let subject_id = require_subject_id(&http_request)?;

    let sanction = data
        .sanctions()
        .submit_appeal(
            path.into_inner(),
            subject_id,
            request.reason.clone(),
            request.evidence_urls.clone(),
        )
        .await?;
    Ok(HttpResponse::Created().json(sanction_body(&sanction)?))
}

/// POST /api/v1/sanctions/{id}/appeal/review
pub async fn begin_appeal_review(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let sanction = data
        .sanctions()
        .begin_appeal_review(path.into_inner(), operator_id)
        .await?;
    Ok(HttpResponse::Ok().json(sanction_body(&sanction)?))
}

/// POST /api/v1/sanctions/{id}/appeal/decision
pub async fn decide_appeal(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<DecideAppealRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let sanction = data
        .sanctions()
        .decide_appeal(
            path.into_inner(),
            operator_id,
            request.decision,
            request.response.clone(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(sanction_body(&sanction)?))
}

fn sanction_body(sanction: &Sanction) -> ApiResult<serde_json::Value> {
    serde_json::to_value(sanction).map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_parses() {
        let parsed: CreateSanctionRequest = serde_json::from_value(json!({
            "subjectId": Uuid::new_v4(),
            "subjectType": "ACCOUNT",
            "sanctionType": "TEMPORARY_BAN",
            "severity": "HIGH",
            "reason": "spam",
            "endAt": "2026-09-01T00:00:00Z",
        }))
        .unwrap();

        assert_eq!(parsed.subject_type, SubjectType::Account);
        assert_eq!(parsed.sanction_type, SanctionType::TemporaryBan);
        assert!(parsed.restricted_features.is_empty());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_revoke_request_requires_reason() {
        let empty = RevokeSanctionRequest {
            reason: String::new(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_decide_request_parses_decisions() {
        let parsed: DecideAppealRequest = serde_json::from_value(json!({
            "decision": "APPROVED",
        }))
        .unwrap();
        assert_eq!(parsed.decision, AppealStatus::Approved);
    }
}
