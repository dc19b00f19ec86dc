//! Request authentication helpers
//!
//! The authoritative per-route policy table lives in `routes.rs`; these
//! helpers are what its entries resolve to. A caller authenticates with
//! the `girok_session` cookie (edge) or a Bearer access token (API
//! clients). Bearer tokens are checked against the revocation list
//! fail-secure: if the cache cannot answer, the token is treated as
//! revoked.

use actix_web::HttpRequest;
use girok_core::entities::session::{Session, SESSION_COOKIE};
use uuid::Uuid;

use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::state::AppState;

/// Resolve the calling session from cookie or Bearer token
pub async fn require_session(req: &HttpRequest, state: &AppState) -> ApiResult<Session> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        let session_id = Uuid::parse_str(cookie.value()).map_err(|_| ApiError::Unauthorized)?;
        return state.sessions().validate(session_id).await;
    }

    if let Some(token) = bearer_token(req) {
        let claims = state
            .tokens()
            .validate(&token)
            .map_err(|_| ApiError::Unauthorized)?;

        // Fail-secure: a cache error means unknown revocation state,
        // which must read as revoked
        let revoked = state
            .cache()
            .is_token_revoked(&claims.jti)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "revocation lookup failed, treating token as revoked");
                ApiError::Unauthorized
            })?;
        if revoked {
            return Err(ApiError::Unauthorized);
        }

        let session_id = Uuid::parse_str(&claims.sid).map_err(|_| ApiError::Unauthorized)?;
        return state.sessions().validate(session_id).await;
    }

    Err(ApiError::Unauthorized)
}

/// Resolve a session and require its MFA gate to be satisfied
pub async fn require_verified_session(
    req: &HttpRequest,
    state: &AppState,
) -> ApiResult<Session> {
    let session = require_session(req, state).await?;
    if !session.is_fully_authenticated() {
        return Err(ApiError::Unauthorized);
    }
    Ok(session)
}

/// Validate the `X-Service-Id` header against the service registry
pub async fn require_service_id(req: &HttpRequest, state: &AppState) -> ApiResult<Uuid> {
    let raw = header_value(req, "X-Service-Id").ok_or(ApiError::Unauthorized)?;
    let service_id = Uuid::parse_str(&raw).map_err(|_| ApiError::Unauthorized)?;

    if !state.registry().is_known(service_id).await? {
        return Err(ApiError::Unauthorized);
    }
    Ok(service_id)
}

/// Identity context for moderation endpoints
pub fn require_operator_id(req: &HttpRequest) -> ApiResult<Uuid> {
    parse_uuid_header(req, "X-Operator-Id")
}

pub fn require_subject_id(req: &HttpRequest) -> ApiResult<Uuid> {
    parse_uuid_header(req, "X-Subject-Id")
}

fn parse_uuid_header(req: &HttpRequest, name: &str) -> ApiResult<Uuid> {
    let raw = header_value(req, name).ok_or(ApiError::Unauthorized)?;
    Uuid::parse_str(&raw).map_err(|_| ApiError::Unauthorized)
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = header_value(req, "Authorization")?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Client metadata captured on auth-sensitive requests
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_request(req: &HttpRequest) -> Self {
        Self {
            ip_address: extract_ip_address(req),
            user_agent: header_value(req, "User-Agent"),
        }
    }
}

/// Extract the client IP, preferring proxy headers
fn extract_ip_address(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded_for) = header_value(req, "X-Forwarded-For") {
        if let Some(ip) = forwarded_for.split(',').next() {
            return Some(ip.trim().to_string());
        }
    }

    if let Some(real_ip) = header_value(req, "X-Real-IP") {
        return Some(real_ip);
    }

    req.connection_info()
        .realip_remote_addr()
        .map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_uuid_header_parsing() {
        let req = test::TestRequest::get().to_http_request();
        assert!(require_operator_id(&req).is_err());

        let id = Uuid::new_v4();
        let req = test::TestRequest::get()
            .insert_header(("X-Operator-Id", id.to_string()))
            .to_http_request();
        assert_eq!(require_operator_id(&req).unwrap(), id);

        let req = test::TestRequest::get()
            .insert_header(("X-Subject-Id", "not-a-uuid"))
            .to_http_request();
        assert!(require_subject_id(&req).is_err());
    }

    #[actix_web::test]
    async fn test_bearer_token_extraction() {
        let req = test::TestRequest::get()
            .insert_header(("Authorization", "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc.def.ghi".to_string()));

        let req = test::TestRequest::get()
            .insert_header(("Authorization", "Basic dGVzdA=="))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = test::TestRequest::get()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[actix_web::test]
    async fn test_forwarded_ip_precedence() {
        let req = test::TestRequest::get()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .insert_header(("X-Real-IP", "10.0.0.2"))
            .to_http_request();
        assert_eq!(extract_ip_address(&req), Some("203.0.113.7".to_string()));
    }
}
