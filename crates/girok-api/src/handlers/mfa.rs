//! MFA management handlers
//!
//! Setup flow: DISABLED -> PROVISIONED on setup, PROVISIONED -> ENABLED
//! on a successful TOTP verify, any -> DISABLED on password-verified
//! disable. Backup-code regeneration swaps the whole set.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::middleware::auth::require_session;
use crate::middleware::error_handler::ApiResult;
use crate::state::AppState;

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct VerifySetupRequest {
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordConfirmRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// Handler functions

/// POST /api/v1/auth/mfa/setup
///
/// Provisions a secret without enabling it; the response is the only
/// time the plaintext backup codes are visible.
pub async fn setup(
    data: web::Data<AppState>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let session = require_session(&http_request, &data).await?;
    let provisioning = data.auth().mfa_setup(session.account_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "secret": provisioning.secret,
        "otpauthUri": provisioning.otpauth_uri,
        "backupCodes": provisioning.backup_codes,
    })))
}

/// POST /api/v1/auth/mfa/verify
pub async fn verify_setup(
    data: web::Data<AppState>,
    request: web::Json<VerifySetupRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let session = require_session(&http_request, &data).await?;

    data.auth()
        .mfa_verify_setup(session.account_id, &request.code, session.id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "MFA enabled",
    })))
}

/// POST /api/v1/auth/mfa/disable
pub async fn disable(
    data: web::Data<AppState>,
    request: web::Json<PasswordConfirmRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let session = require_session(&http_request, &data).await?;

    data.auth()
        .mfa_disable(session.account_id, &request.password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "MFA disabled",
    })))
}

/// POST /api/v1/auth/mfa/backup-codes/regenerate
pub async fn regenerate_backup_codes(
    data: web::Data<AppState>,
    request: web::Json<PasswordConfirmRequest>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let session = require_session(&http_request, &data).await?;

    let codes = data
        .auth()
        .regenerate_backup_codes(session.account_id, &request.password)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "backupCodes": codes,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_setup_request_validation() {
        let valid = VerifySetupRequest {
            code: "123456".to_string(),
        };
        assert!(valid.validate().is_ok());

        let wrong_length = VerifySetupRequest {
            code: "12345".to_string(),
        };
        assert!(wrong_length.validate().is_err());
    }

    #[test]
    fn test_password_confirm_validation() {
        let empty = PasswordConfirmRequest {
            password: String::new(),
        };
        assert!(empty.validate().is_err());
    }
}
