//! DSR handlers
//!
//! The stable REST surface for data-subject requests. Submission and
//! cancellation are subject-facing; verification, processing,
//! assignment and deadline extension are operator-facing and carry
//! `X-Operator-Id`.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use girok_core::entities::dsr::{
    DsrPriority, DsrRequest, DsrResponseType, DsrScope, DsrStatus, DsrType, LegalBasis,
};
use girok_db::entities::dsr_request_log;
use girok_db::repositories::DsrFilter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::ListResponse;
use crate::middleware::auth::{require_operator_id, require_session, ClientInfo};
use crate::middleware::error_handler::ApiResult;
use crate::services::dsr::{OperationContext, ProcessAction};
use crate::state::AppState;

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDsrRequest {
    pub request_type: DsrType,
    pub legal_basis: LegalBasis,
    #[serde(default)]
    pub scope: DsrScope,
    pub priority: Option<DsrPriority>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDsrRequest {
    pub action: ProcessAction,
    pub response_type: Option<DsrResponseType>,
    pub response_body: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExtendDeadlineRequest {
    pub new_deadline: DateTime<Utc>,
    #[validate(length(min = 1, max = 1000, message = "Reason must be 1 to 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDsrRequest {
    pub assignee: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub account_id: Option<Uuid>,
    pub status: Option<DsrStatus>,
    #[serde(rename = "type")]
    pub request_type: Option<DsrType>,
    pub assigned_to: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// Response DTOs

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DsrLogResponse {
    pub id: String,
    pub action: String,
    pub operator_id: Option<String>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: String,
}

impl From<dsr_request_log::Model> for DsrLogResponse {
    fn from(model: dsr_request_log::Model) -> Self {
        Self {
            id: model.id.to_string(),
            action: model.action,
            operator_id: model.operator_id.map(|id| id.to_string()),
            details: model.details,
            ip_address: model.ip_address,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

// Handler functions

/// POST /api/v1/dsr-requests
pub async fn submit(
    data: web::Data<AppState>,
    request: web::Json<SubmitDsrRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let session = require_session(&http_request, &data).await?;
    let ctx = operation_context(&http_request, None);

    let dsr = data
        .dsr()
        .submit(
            session.account_id,
            request.request_type,
            request.legal_basis,
            request.scope.clone(),
            request.priority.unwrap_or(DsrPriority::Normal),
            &ctx,
        )
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "request": dsr,
    })))
}

/// GET /api/v1/dsr-requests
pub async fn list(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let filter = DsrFilter {
        account_id: query.account_id,
        status: query.status,
        request_type: query.request_type,
        assigned_to: query.assigned_to,
        page,
        limit,
    };

    let (requests, total) = data.dsr().list(&filter).await?;
    Ok(HttpResponse::Ok().json(ListResponse::new(requests, total, page, limit)))
}

/// GET /api/v1/dsr-requests/statistics
pub async fn statistics(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let stats = data.dsr().statistics().await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// GET /api/v1/dsr-requests/overdue
pub async fn overdue(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let requests: Vec<DsrRequest> = data.dsr().overdue().await?;
    Ok(HttpResponse::Ok().json(json!({ "data": requests })))
}

/// GET /api/v1/dsr-requests/{id}
pub async fn get(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let request = data.dsr().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// GET /api/v1/dsr-requests/{id}/logs
pub async fn logs(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    require_operator_id(&http_request)?;
    let logs = data.dsr().logs(path.into_inner()).await?;
    let rows: Vec<DsrLogResponse> = logs.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(json!({ "data": rows })))
}

/// POST /api/v1/dsr-requests/{id}/verify
pub async fn verify(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let ctx = operation_context(&http_request, Some(operator_id));

    let request = data.dsr().verify(path.into_inner(), &ctx).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "request": request })))
}

/// POST /api/v1/dsr-requests/{id}/process
pub async fn process(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<ProcessDsrRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let ctx = operation_context(&http_request, Some(operator_id));

    let dsr = data
        .dsr()
        .process(
            path.into_inner(),
            request.action,
            request.response_type,
            request.response_body.clone(),
            request.note.clone(),
            &ctx,
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "request": dsr })))
}

/// POST /api/v1/dsr-requests/{id}/extend-deadline
pub async fn extend_deadline(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<ExtendDeadlineRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let operator_id = require_operator_id(&http_request)?;
    let ctx = operation_context(&http_request, Some(operator_id));

    let dsr = data
        .dsr()
        .extend_deadline(
            path.into_inner(),
            request.new_deadline,
            request.reason.clone(),
            &ctx,
        )
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "request": dsr })))
}

/// POST /api/v1/dsr-requests/{id}/assign
pub async fn assign(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<AssignDsrRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let operator_id = require_operator_id(&http_request)?;
    let ctx = operation_context(&http_request, Some(operator_id));

    let dsr = data
        .dsr()
        .assign(path.into_inner(), request.assignee, &ctx)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "request": dsr })))
}

/// DELETE /api/v1/dsr-requests/{id}
pub async fn cancel(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;
    let id = path.into_inner();

    // Subjects may only cancel their own requests
    let existing = data.dsr().get(id).await?;
    if existing.account_id != session.account_id {
        return Err(crate::middleware::error_handler::ApiError::Forbidden);
    }

    let ctx = operation_context(&http_request, None);
    let request = data.dsr().cancel(id, &ctx).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "request": request })))
}

fn operation_context(req: &HttpRequest, operator_id: Option<Uuid>) -> OperationContext {
    let client = ClientInfo::from_request(req);
    OperationContext {
        operator_id,
        ip_address: client.ip_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_parses() {
        let parsed: SubmitDsrRequest = serde_json::from_value(json!({
            "requestType": "ERASURE",
            "legalBasis": "GDPR",
            "scope": { "dataCategories": ["profile"] },
        }))
        .unwrap();

        assert_eq!(parsed.request_type, DsrType::Erasure);
        assert_eq!(parsed.legal_basis, LegalBasis::Gdpr);
        assert_eq!(parsed.scope.data_categories, vec!["profile".to_string()]);
        assert!(parsed.priority.is_none());
    }

    #[test]
    fn test_process_request_parses_actions() {
        for (raw, expected) in [
            ("START", ProcessAction::Start),
            ("AWAIT_INFO", ProcessAction::AwaitInfo),
            ("RESUME", ProcessAction::Resume),
            ("COMPLETE", ProcessAction::Complete),
            ("REJECT", ProcessAction::Reject),
        ] {
            let parsed: ProcessDsrRequest =
                serde_json::from_value(json!({ "action": raw })).unwrap();
            assert_eq!(parsed.action, expected);
        }
    }

    #[test]
    fn test_extend_request_requires_reason() {
        let no_reason = ExtendDeadlineRequest {
            new_deadline: Utc::now(),
            reason: String::new(),
        };
        assert!(no_reason.validate().is_err());
    }
}
