//! Authentication handlers
//!
//! Registration, the two-step login, logout and password change.
//! Successful auth sets the `girok_session` cookie and returns a
//! short-lived access token.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use girok_core::auth::MfaMethod;
use girok_core::entities::account::{Account, AccountMode, AccountStatus};
use girok_core::entities::session::{SESSION_COOKIE, SESSION_COOKIE_MAX_AGE_SECS};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::middleware::auth::{
    require_service_id, require_session, require_verified_session, ClientInfo,
};
use crate::middleware::error_handler::{ApiError, ApiResult};
use crate::services::auth::{LoginOutcome, SessionBundle};
use crate::state::AppState;

// Request DTOs

/// Account registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,

    #[validate(length(min = 2, max = 50, message = "Username must be 2 to 50 characters"))]
    pub username: String,
}

/// Login primary-step request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login MFA-step request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginMfaRequest {
    #[validate(length(min = 1, message = "Challenge ID is required"))]
    pub challenge_id: String,

    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,

    pub method: MfaMethod,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub new_password: String,
}

// Response DTOs

/// Account projection returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub username: String,
    pub status: AccountStatus,
    pub mode: AccountMode,
    pub mfa_enabled: bool,
    pub email_verified: bool,
    pub country: Option<String>,
    pub locale: Option<String>,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.to_string(),
            external_id: account.external_id,
            email: account.email,
            username: account.username,
            status: account.status,
            mode: account.mode,
            mfa_enabled: account.mfa_enabled,
            email_verified: account.email_verified,
            country: account.country,
            locale: account.locale,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

// Handler functions

/// POST /api/v1/auth/register
pub async fn register(
    data: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let service_id = require_service_id(&http_request, &data).await?;
    let client = ClientInfo::from_request(&http_request);

    let bundle = data
        .auth()
        .register(
            request.email.clone(),
            request.password.clone(),
            request.username.clone(),
            service_id,
            &client,
        )
        .await?;

    info!(account_id = %bundle.account.id, "registration complete");
    session_response(&data, bundle, actix_web::http::StatusCode::CREATED)
}

/// POST /api/v1/auth/login
pub async fn login(
    data: web::Data<AppState>,
    request: web::Json<LoginRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate().map_err(|_| ApiError::InvalidCredentials)?;
    require_service_id(&http_request, &data).await?;
    let client = ClientInfo::from_request(&http_request);

    match data
        .auth()
        .login(&request.email, &request.password, &client)
        .await?
    {
        LoginOutcome::Complete(bundle) => {
            session_response(&data, *bundle, actix_web::http::StatusCode::OK)
        }
        LoginOutcome::MfaRequired {
            challenge_id,
            methods,
        } => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "mfaRequired": true,
            "challengeId": challenge_id,
            "availableMethods": methods,
        }))),
    }
}

/// POST /api/v1/auth/login/mfa
pub async fn login_mfa(
    data: web::Data<AppState>,
    request: web::Json<LoginMfaRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let client = ClientInfo::from_request(&http_request);

    let bundle = data
        .auth()
        .login_mfa(&request.challenge_id, &request.code, request.method, &client)
        .await?;

    session_response(&data, bundle, actix_web::http::StatusCode::OK)
}

/// POST /api/v1/auth/logout
///
/// Idempotent: succeeds whether or not the session still exists.
pub async fn logout(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let jti = bearer_jti(&data, &http_request);

    if let Some(cookie) = http_request.cookie(SESSION_COOKIE) {
        if let Ok(session_id) = uuid::Uuid::parse_str(cookie.value()) {
            data.auth().logout(session_id, jti.as_deref()).await?;
        }
    } else if let Some(ref jti_value) = jti {
        // Token-only logout still revokes the token
        data.cache()
            .revoke_token(jti_value, std::time::Duration::from_secs(3600))
            .await?;
    }

    let mut response = HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out",
    }));
    let _ = response.add_cookie(&expired_session_cookie());
    Ok(response)
}

/// GET /api/v1/auth/me
pub async fn get_current_account(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;
    let account = data.auth().get_account(session.account_id).await?;
    Ok(HttpResponse::Ok().json(AccountResponse::from(account)))
}

/// POST /api/v1/auth/password
pub async fn change_password(
    data: web::Data<AppState>,
    request: web::Json<ChangePasswordRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    // Sessions that still owe a second factor cannot rotate credentials
    let session = require_verified_session(&http_request, &data).await?;

    data.auth()
        .change_password(
            session.account_id,
            &request.current_password,
            &request.new_password,
            session.id,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password changed",
    })))
}

// Helpers

/// Render a session bundle: cookie + access token + account projection
fn session_response(
    data: &AppState,
    bundle: SessionBundle,
    status: actix_web::http::StatusCode,
) -> ApiResult<HttpResponse> {
    let issued = data
        .tokens()
        .issue(bundle.account.id, bundle.session.id, bundle.session.context)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let cookie = session_cookie(&bundle.session.id.to_string());

    let body = json!({
        "success": true,
        "user": AccountResponse::from(bundle.account),
        "accessToken": issued.token,
        "refreshToken": bundle.refresh_token,
        "expiresIn": issued.expires_in,
        "sessionId": bundle.session.id,
        "mfaVerified": bundle.session.mfa_verified,
    });

    let mut response = HttpResponse::build(status).json(body);
    response
        .add_cookie(&cookie)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(response)
}

/// The edge session cookie: HttpOnly, Secure, SameSite=Lax
fn session_cookie(session_id: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session_id.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(SESSION_COOKIE_MAX_AGE_SECS))
        .finish()
}

fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie("");
    cookie.set_max_age(CookieDuration::seconds(0));
    cookie
}

/// JTI of the presented bearer token, if any
fn bearer_jti(data: &AppState, req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    data.tokens().validate(token).ok().map(|claims| claims.jti)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "SecurePassword123!".to_string(),
            username: "alice".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid_email = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "SecurePassword123!".to_string(),
            username: "alice".to_string(),
        };
        assert!(invalid_email.validate().is_err());

        let short_password = RegisterRequest {
            email: "alice@example.com".to_string(),
            password: "short".to_string(),
            username: "alice".to_string(),
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("0190a8b0-0000-7000-8000-000000000000");

        assert_eq!(cookie.name(), "girok_session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(
            cookie.max_age(),
            Some(CookieDuration::seconds(1_209_600))
        );
    }

    #[test]
    fn test_account_response_projection() {
        let account = Account::new("alice@example.com".to_string(), "alice".to_string());
        let response = AccountResponse::from(account.clone());

        assert_eq!(response.id, account.id.to_string());
        assert_eq!(response.email, "alice@example.com");
        // No credential material in the projection
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_login_mfa_request_parses_method() {
        let parsed: LoginMfaRequest = serde_json::from_value(json!({
            "challengeId": "abc",
            "code": "123456",
            "method": "totp",
        }))
        .unwrap();
        assert_eq!(parsed.method, MfaMethod::Totp);

        let parsed: LoginMfaRequest = serde_json::from_value(json!({
            "challengeId": "abc",
            "code": "AAAA-BBBB",
            "method": "backup_code",
        }))
        .unwrap();
        assert_eq!(parsed.method, MfaMethod::BackupCode);
    }
}
