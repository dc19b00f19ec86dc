//! Cache-resident MFA challenges
//!
//! Minted after a successful primary login when the account has MFA
//! enabled. Challenges live in the shared cache (not process memory) so
//! that any replica can complete a login another replica started. They
//! are single-use and expire after five minutes.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Challenge lifetime
pub const CHALLENGE_TTL_SECS: u64 = 300;

/// Second-factor methods a challenge may be completed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMethod {
    Totp,
    BackupCode,
}

impl MfaMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MfaMethod::Totp => "totp",
            MfaMethod::BackupCode => "backup_code",
        }
    }
}

/// A pending second-factor challenge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaChallenge {
    /// Opaque challenge ID handed to the client
    pub id: String,

    /// Account that passed the primary step
    pub account_id: Uuid,

    /// Email as stored on the account
    pub email: String,

    /// Methods the account can complete the challenge with
    pub methods: Vec<MfaMethod>,

    /// Hard expiry; consumption after this instant is rejected
    pub expires_at: DateTime<Utc>,
}

impl MfaChallenge {
    /// Mint a new challenge for an account
    pub fn new(account_id: Uuid, email: String, methods: Vec<MfaMethod>) -> Self {
        Self {
            id: new_challenge_id(),
            account_id,
            email,
            methods,
            expires_at: Utc::now() + Duration::seconds(CHALLENGE_TTL_SECS as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn allows(&self, method: MfaMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// Generate a 32-byte crypto-random challenge ID, hex-encoded
pub fn new_challenge_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(64);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_id_shape() {
        let id = new_challenge_id();
        assert_eq!(id.len(), 64);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(id, new_challenge_id());
    }

    #[test]
    fn test_new_challenge_is_unexpired() {
        let challenge = MfaChallenge::new(
            Uuid::new_v4(),
            "alice@example.com".to_string(),
            vec![MfaMethod::Totp, MfaMethod::BackupCode],
        );

        assert!(!challenge.is_expired());
        assert!(challenge.allows(MfaMethod::Totp));
        assert!(challenge.allows(MfaMethod::BackupCode));
    }

    #[test]
    fn test_expired_challenge() {
        let mut challenge = MfaChallenge::new(
            Uuid::new_v4(),
            "alice@example.com".to_string(),
            vec![MfaMethod::Totp],
        );
        challenge.expires_at = Utc::now() - Duration::seconds(1);

        assert!(challenge.is_expired());
        assert!(!challenge.allows(MfaMethod::BackupCode));
    }

    #[test]
    fn test_method_serialization() {
        assert_eq!(
            serde_json::to_string(&MfaMethod::BackupCode).unwrap(),
            "\"backup_code\""
        );
        assert_eq!(MfaMethod::Totp.as_str(), "totp");
    }
}
