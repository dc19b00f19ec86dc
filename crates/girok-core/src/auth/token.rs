//! JWT access tokens
//!
//! Short-lived bearer tokens for service-to-service and API clients.
//! Sessions remain the source of truth; tokens carry a `jti` so a
//! logout or password change can revoke them early through the cache
//! revocation list (fail-secure, see the cache module).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::session::SessionContext;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret key for signing tokens
    pub secret: String,

    /// Token issuer
    pub issuer: String,

    /// Access token lifetime (default: 1 hour)
    pub access_token_duration: Duration,

    /// Signing algorithm (default: HS256)
    pub algorithm: Algorithm,
}

impl TokenConfig {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            issuer: "girok".to_string(),
            access_token_duration: Duration::hours(1),
            algorithm: Algorithm::HS256,
        }
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account ID)
    pub sub: String,

    /// Session the token was minted for
    pub sid: String,

    /// Issued at
    pub iat: i64,

    /// Expiration time
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// JWT ID, used for revocation lookups
    pub jti: String,

    /// Session context (user or operator)
    pub ctx: SessionContext,
}

/// Token generation and validation
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[config.issuer.clone()]);
        validation.validate_exp = true;

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Mint an access token for a session
    pub fn issue(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        context: SessionContext,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let exp = now + self.config.access_token_duration;

        let claims = AccessClaims {
            sub: account_id.to_string(),
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            ctx: context,
        };

        let header = Header::new(self.config.algorithm);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti: claims.jti.clone(),
            expires_in: self.config.access_token_duration.num_seconds(),
        })
    }

    /// Validate a token's signature, issuer and expiry
    ///
    /// Revocation is a separate cache lookup on `claims.jti`; callers
    /// must perform it before trusting the claims.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

/// A freshly issued token and the metadata the caller needs
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_in: i64,
}

/// Token-related errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Invalid token: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TokenConfig::new("test-secret".to_string()))
    }

    #[test]
    fn test_issue_and_validate() {
        let service = service();
        let account_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        let issued = service
            .issue(account_id, session_id, SessionContext::User)
            .unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.sid, session_id.to_string());
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.ctx, SessionContext::User);
    }

    #[test]
    fn test_validate_rejects_wrong_secret() {
        let issued = service()
            .issue(Uuid::new_v4(), Uuid::new_v4(), SessionContext::Operator)
            .unwrap();

        let other = TokenService::new(TokenConfig::new("other-secret".to_string()));
        assert!(other.validate(&issued.token).is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(service().validate("not-a-jwt").is_err());
    }
}
