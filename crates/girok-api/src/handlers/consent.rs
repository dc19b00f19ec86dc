//! Consent handlers

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::middleware::auth::require_session;
use crate::middleware::error_handler::ApiResult;
use crate::state::AppState;

// Request DTOs

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantConsentRequest {
    pub document_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub document_id: Uuid,
}

// Handler functions

/// POST /api/v1/consents
pub async fn grant(
    data: web::Data<AppState>,
    request: web::Json<GrantConsentRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;

    let consent = data
        .consents()
        .grant(session.account_id, request.document_id, request.expires_at)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "consent": consent,
    })))
}

/// DELETE /api/v1/consents/{id}
pub async fn withdraw(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;

    let consent = data
        .consents()
        .withdraw(path.into_inner(), session.account_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "consent": consent,
    })))
}

/// GET /api/v1/consents
pub async fn list(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;
    let consents = data.consents().list_for_account(session.account_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": consents })))
}

/// GET /api/v1/consents/status?documentId=...
pub async fn status(
    data: web::Data<AppState>,
    query: web::Query<StatusQuery>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;
    let consent = data
        .consents()
        .status(session.account_id, query.document_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "documentId": query.document_id,
        "granted": consent.is_some(),
        "consent": consent,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_request_parses() {
        let parsed: GrantConsentRequest = serde_json::from_value(json!({
            "documentId": Uuid::new_v4(),
            "expiresAt": "2027-01-01T00:00:00Z",
        }))
        .unwrap();
        assert!(parsed.expires_at.is_some());

        let no_expiry: GrantConsentRequest = serde_json::from_value(json!({
            "documentId": Uuid::new_v4(),
        }))
        .unwrap();
        assert!(no_expiry.expires_at.is_none());
    }
}
