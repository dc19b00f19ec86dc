//! Short Base62 external identifiers
//!
//! Client-facing 10-character IDs: the first 8 characters encode the
//! milliseconds since 2025-01-01 UTC in Base62 (zero-padded, so lexical
//! order equals numeric order), the last 2 are CSPRNG-chosen. Collision
//! handling is the inserting repository's job (re-generate, bounded
//! retries).

use chrono::{TimeZone, Utc};
use rand::{rngs::OsRng, Rng};

/// Base62 alphabet ordered so that lexical comparison matches numeric
/// comparison of the encoded value.
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of the timestamp prefix
const TIME_LEN: usize = 8;

/// Length of the random suffix
const RANDOM_LEN: usize = 2;

/// Total external ID length
pub const EXTERNAL_ID_LEN: usize = TIME_LEN + RANDOM_LEN;

/// Maximum number of insert-time collision retries
pub const MAX_COLLISION_RETRIES: usize = 3;

/// Milliseconds of the external-ID epoch (2025-01-01T00:00:00Z)
fn epoch_ms() -> i64 {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(1_735_689_600_000)
}

/// A 10-character Base62 external identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(String);

impl ExternalId {
    /// Generate a fresh external ID for the current instant
    pub fn generate() -> Self {
        Self::generate_at(Utc::now().timestamp_millis())
    }

    /// Generate an external ID for a specific wall-clock millisecond
    pub fn generate_at(now_ms: i64) -> Self {
        let elapsed = (now_ms - epoch_ms()).max(0) as u64;
        let mut id = encode_base62(elapsed, TIME_LEN);

        let mut rng = OsRng;
        for _ in 0..RANDOM_LEN {
            let idx = rng.gen_range(0..ALPHABET.len());
            id.push(ALPHABET[idx] as char);
        }

        Self(id)
    }

    /// Validate and wrap an existing external ID string
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() != EXTERNAL_ID_LEN {
            return None;
        }
        if !value.bytes().all(|b| ALPHABET.contains(&b)) {
            return None;
        }
        Some(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a value in Base62, zero-padded to `width` characters
fn encode_base62(mut value: u64, width: usize) -> String {
    let mut digits = vec![b'0'; width];
    let mut pos = width;
    while value > 0 && pos > 0 {
        pos -= 1;
        digits[pos] = ALPHABET[(value % 62) as usize];
        value /= 62;
    }
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        let id = ExternalId::generate();
        assert_eq!(id.as_str().len(), EXTERNAL_ID_LEN);
        assert!(id.as_str().bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_time_prefix_is_lexically_ordered() {
        let earlier = ExternalId::generate_at(epoch_ms() + 1_000);
        let later = ExternalId::generate_at(epoch_ms() + 2_000);

        assert!(earlier.as_str()[..TIME_LEN] < later.as_str()[..TIME_LEN]);
    }

    #[test]
    fn test_epoch_encodes_to_zeroes() {
        let id = ExternalId::generate_at(epoch_ms());
        assert_eq!(&id.as_str()[..TIME_LEN], "00000000");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ExternalId::parse("short").is_none());
        assert!(ExternalId::parse("has spaces!").is_none());
        assert!(ExternalId::parse("0000000000").is_some());
    }

    #[test]
    fn test_encode_base62_known_values() {
        assert_eq!(encode_base62(0, 8), "00000000");
        assert_eq!(encode_base62(61, 8), "0000000z");
        assert_eq!(encode_base62(62, 8), "00000010");
    }
}
