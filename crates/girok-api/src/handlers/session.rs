//! Session management handlers
//!
//! Owner-facing session listing and revocation, and the refresh-token
//! exchange.

use actix_web::{web, HttpRequest, HttpResponse};
use girok_core::entities::session::Session;
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::middleware::auth::require_session;
use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::state::AppState;

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

// Response DTOs

/// Session projection; no token material
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub mfa_verified: bool,
    pub created_at: String,
    pub last_activity_at: String,
    pub expires_at: String,
    pub current: bool,
}

impl SessionResponse {
    fn from_session(session: Session, current_id: uuid::Uuid) -> Self {
        Self {
            id: session.id.to_string(),
            device_fingerprint: session.device_fingerprint,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            mfa_verified: session.mfa_verified,
            created_at: session.created_at.to_rfc3339(),
            last_activity_at: session.last_activity_at.to_rfc3339(),
            expires_at: session.expires_at.to_rfc3339(),
            current: session.id == current_id,
        }
    }
}

// Handler functions

/// POST /api/v1/auth/refresh
pub async fn refresh(
    data: web::Data<AppState>,
    request: web::Json<RefreshRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let (session, new_refresh_token) =
        data.sessions().refresh(&request.refresh_token).await?;

    let issued = data
        .tokens()
        .issue(session.account_id, session.id, session.context)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "accessToken": issued.token,
        "refreshToken": new_refresh_token,
        "expiresIn": issued.expires_in,
    })))
}

/// GET /api/v1/auth/sessions
pub async fn list_sessions(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let current = require_session(&http_request, &data).await?;
    let sessions = data.sessions().list_for_account(current.account_id).await?;

    let responses: Vec<SessionResponse> = sessions
        .into_iter()
        .map(|s| SessionResponse::from_session(s, current.id))
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "data": responses })))
}

/// DELETE /api/v1/auth/sessions/{id}
pub async fn revoke_session(
    data: web::Data<AppState>,
    path: web::Path<uuid::Uuid>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let current = require_session(&http_request, &data).await?;
    let target_id = path.into_inner();

    // Only the owner may revoke their sessions
    let owned = data
        .sessions()
        .list_for_account(current.account_id)
        .await?
        .iter()
        .any(|s| s.id == target_id);
    if !owned {
        return Err(ApiError::NotFound("session".to_string()));
    }

    data.sessions().revoke(target_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Session revoked",
    })))
}

/// DELETE /api/v1/auth/sessions
///
/// Revokes every session of the account except the calling one.
pub async fn revoke_other_sessions(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let current = require_session(&http_request, &data).await?;

    let txn = data
        .db
        .begin()
        .await
        .map_err(girok_db::DbError::from)?;
    let revoked = data
        .sessions()
        .revoke_all_except_in_txn(&txn, current.account_id, Some(current.id))
        .await?;
    txn.commit().await.map_err(girok_db::DbError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "revoked": revoked,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use girok_core::entities::session::SessionContext;

    #[test]
    fn test_refresh_request_validation() {
        let empty = RefreshRequest {
            refresh_token: String::new(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_session_projection_hides_token_hash() {
        let session = Session::new(
            uuid::Uuid::new_v4(),
            "a".repeat(64),
            SessionContext::User,
            false,
        );
        let current_id = session.id;
        let response = SessionResponse::from_session(session, current_id);

        assert!(response.current);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("refreshTokenHash").is_none());
    }
}
