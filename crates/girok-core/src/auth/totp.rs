//! RFC 6238 time-based one-time passwords
//!
//! SHA-1 HMAC, 6 digits, 30-second period. Verification accepts the
//! current window and one step of drift in either direction. Secrets
//! are 20 random bytes, exchanged as unpadded Base32.

use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha1::Sha1;

use crate::errors::{CoreError, CoreResult};

type HmacSha1 = Hmac<Sha1>;

/// Number of OTP digits
pub const DIGITS: u32 = 6;

/// Time-step in seconds
pub const PERIOD: u64 = 30;

/// Raw secret length in bytes
pub const SECRET_LEN: usize = 20;

/// Accepted clock-drift windows on either side of now
pub const DRIFT_WINDOWS: i64 = 1;

/// Issuer label used in provisioning URIs
pub const ISSUER: &str = "Girok Admin";

/// Generate a fresh Base32-encoded TOTP secret
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    base32::encode(base32::Alphabet::RFC4648 { padding: false }, &bytes)
}

/// Compute the OTP for a secret at a given Unix timestamp
pub fn code_at(secret_base32: &str, unix_secs: u64) -> CoreResult<String> {
    let counter = unix_secs / PERIOD;
    code_for_counter(secret_base32, counter)
}

/// Compute the OTP for the current instant
pub fn current_code(secret_base32: &str) -> CoreResult<String> {
    code_at(secret_base32, now_secs())
}

/// Verify a submitted code against the current time, allowing drift
pub fn verify(secret_base32: &str, code: &str) -> CoreResult<bool> {
    verify_at(secret_base32, code, now_secs())
}

/// Verify a submitted code at a specific Unix timestamp
pub fn verify_at(secret_base32: &str, code: &str, unix_secs: u64) -> CoreResult<bool> {
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(false);
    }

    let counter = (unix_secs / PERIOD) as i64;
    for drift in -DRIFT_WINDOWS..=DRIFT_WINDOWS {
        let candidate = counter + drift;
        if candidate < 0 {
            continue;
        }
        if code_for_counter(secret_base32, candidate as u64)? == code {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Build the otpauth:// provisioning URI for authenticator apps
pub fn provisioning_uri(secret_base32: &str, email: &str) -> String {
    let issuer = percent_encode(ISSUER);
    let label = percent_encode(email);
    format!(
        "otpauth://totp/{issuer}:{label}?secret={secret}&algorithm=SHA1&digits={digits}&period={period}&issuer={issuer}",
        issuer = issuer,
        label = label,
        secret = secret_base32,
        digits = DIGITS,
        period = PERIOD,
    )
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn code_for_counter(secret_base32: &str, counter: u64) -> CoreResult<String> {
    let secret = base32::decode(base32::Alphabet::RFC4648 { padding: false }, secret_base32)
        .ok_or_else(|| CoreError::validation("TOTP secret is not valid Base32"))?;

    let mut mac = HmacSha1::new_from_slice(&secret)
        .map_err(|e| CoreError::internal(format!("HMAC init failed: {e}")))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // RFC 4226 dynamic truncation
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((u32::from(digest[offset]) & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    let code = binary % 10u32.pow(DIGITS);
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

/// Minimal percent-encoding for URI labels (space, colon, and friends)
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Shared secret from RFC 6238's test vectors, Base32-encoded
    const SECRET: &str = "JBSWY3DPEHPK3PXP";

    #[test]
    fn test_generated_secret_shape() {
        let secret = generate_secret();
        let decoded =
            base32::decode(base32::Alphabet::RFC4648 { padding: false }, &secret).unwrap();
        assert_eq!(decoded.len(), SECRET_LEN);
        assert!(!secret.contains('='));
    }

    #[test]
    fn test_code_roundtrip() {
        let now = 1_700_000_000;
        let code = code_at(SECRET, now).unwrap();
        assert_eq!(code.len(), DIGITS as usize);
        assert!(verify_at(SECRET, &code, now).unwrap());
    }

    #[test]
    fn test_drift_window() {
        let now = 1_700_000_000;
        let previous = code_at(SECRET, now - PERIOD).unwrap();
        let next = code_at(SECRET, now + PERIOD).unwrap();

        assert!(verify_at(SECRET, &previous, now).unwrap());
        assert!(verify_at(SECRET, &next, now).unwrap());

        // Two windows away falls outside the drift allowance
        let far = code_at(SECRET, now + 2 * PERIOD).unwrap();
        if far != code_at(SECRET, now).unwrap()
            && far != previous
            && far != next
        {
            assert!(!verify_at(SECRET, &far, now).unwrap());
        }
    }

    #[test]
    fn test_codes_differ_across_windows() {
        let now = 1_700_000_000;
        let here = code_at(SECRET, now).unwrap();
        let there = code_at(SECRET, now + 2 * PERIOD).unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_rejects_malformed_codes() {
        assert!(!verify_at(SECRET, "12345", 1_700_000_000).unwrap());
        assert!(!verify_at(SECRET, "abcdef", 1_700_000_000).unwrap());
        assert!(!verify_at(SECRET, "1234567", 1_700_000_000).unwrap());
    }

    #[test]
    fn test_provisioning_uri_format() {
        let uri = provisioning_uri(SECRET, "alice@example.com");
        assert!(uri.starts_with("otpauth://totp/Girok%20Admin:alice@example.com?"));
        assert!(uri.contains(&format!("secret={SECRET}")));
        assert!(uri.contains("algorithm=SHA1"));
        assert!(uri.contains("digits=6"));
        assert!(uri.contains("period=30"));
        assert!(uri.contains("issuer=Girok%20Admin"));
    }

    #[test]
    fn test_invalid_secret_is_an_error() {
        assert!(code_at("not-base32!!", 1_700_000_000).is_err());
    }
}
