//! API error type and the error envelope
//!
//! Every handler failure renders as `{"error": {code, message,
//! details?}}`. Credential failures share one message so wrong-email
//! and wrong-password are indistinguishable to the caller.

use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Application errors that convert to HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid MFA code")]
    InvalidMfaCode,

    #[error("Invalid or expired MFA challenge")]
    InvalidChallenge,

    #[error("Account is temporarily locked")]
    AccountLocked { retry_after_secs: i64 },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable code for the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::InvalidMfaCode => "INVALID_MFA_CODE",
            ApiError::InvalidChallenge => "INVALID_CHALLENGE",
            ApiError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Precondition(_) => "PRECONDITION",
            ApiError::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL",
        }
    }
}

/// Error envelope body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials
            | ApiError::InvalidMfaCode
            | ApiError::InvalidChallenge
            | ApiError::AccountLocked { .. }
            | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Precondition(_) => StatusCode::CONFLICT,
            ApiError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal detail stays in the log; the envelope carries no
        // internals or PII
        if let ApiError::Internal(detail) = self {
            tracing::error!(detail, "internal error");
        }

        let details = match self {
            ApiError::AccountLocked { retry_after_secs } => {
                Some(json!({ "retryAfterSecs": retry_after_secs }))
            }
            _ => None,
        };

        let body = json!({
            "error": ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            }
        });

        let mut response = HttpResponse::build(self.status_code());
        if let ApiError::AccountLocked { retry_after_secs } = self {
            response.insert_header(("Retry-After", retry_after_secs.to_string()));
        }
        response.json(body)
    }
}

impl From<girok_core::CoreError> for ApiError {
    fn from(err: girok_core::CoreError) -> Self {
        use girok_core::CoreError;

        match err {
            CoreError::Validation(msg) => ApiError::InvalidInput(msg),
            CoreError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id}"))
            }
            CoreError::Conflict(msg) => ApiError::Conflict(msg),
            CoreError::Precondition(msg) => ApiError::Precondition(msg),
            CoreError::InvalidTransition { from, to } => {
                ApiError::Conflict(format!("illegal transition from {from} to {to}"))
            }
            CoreError::CredentialVerification => ApiError::InvalidCredentials,
            CoreError::Cache(msg) | CoreError::Bus(msg) => ApiError::DependencyUnavailable(msg),
            CoreError::Serialization(msg) | CoreError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<girok_db::DbError> for ApiError {
    fn from(err: girok_db::DbError) -> Self {
        use girok_db::DbError;

        match err {
            DbError::NotFound(msg) => ApiError::NotFound(msg),
            DbError::ConstraintViolation(msg) => ApiError::Conflict(msg),
            DbError::Connection(msg) => ApiError::DependencyUnavailable(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for field '{field}'"));
                messages.push(message);
            }
        }
        ApiError::InvalidInput(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidInput("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::AccountLocked {
                retry_after_secs: 900
            }
            .status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Precondition("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::DependencyUnavailable("x".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_credential_errors_share_wording() {
        // Unknown email and wrong password render identically
        let a = ApiError::InvalidCredentials.to_string();
        let b = ApiError::InvalidCredentials.to_string();
        assert_eq!(a, b);
        assert!(!a.to_lowercase().contains("email not found"));
    }

    #[test]
    fn test_lockout_carries_retry_after() {
        let error = ApiError::AccountLocked {
            retry_after_secs: 900,
        };
        let response = error.error_response();
        assert_eq!(
            response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok()),
            Some("900")
        );
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = girok_core::CoreError::precondition("not active").into();
        assert_eq!(err.code(), "PRECONDITION");

        let err: ApiError = girok_core::CoreError::cache("down").into();
        assert_eq!(err.code(), "DEPENDENCY_UNAVAILABLE");

        let err: ApiError = girok_core::CoreError::invalid_transition("A", "B").into();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_validation_error_conversion() {
        use validator::Validate;

        #[derive(Validate)]
        struct TestStruct {
            #[validate(length(min = 1))]
            name: String,
        }

        let test_struct = TestStruct {
            name: String::new(),
        };
        let api_error: ApiError = test_struct.validate().unwrap_err().into();

        match api_error {
            ApiError::InvalidInput(_) => (),
            _ => panic!("Expected InvalidInput"),
        }
    }
}
