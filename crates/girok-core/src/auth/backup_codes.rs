//! MFA backup codes
//!
//! Ten single-use recovery codes, eight characters each, drawn from an
//! alphabet without the ambiguous 0/O/1/I glyphs and displayed as
//! `XXXX-XXXX`. Only SHA-256 digests of the normalized form are stored;
//! verification is constant-time over the full stored set and removes
//! the matched digest.

use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of codes issued per set
pub const CODE_COUNT: usize = 10;

/// Code length excluding the display dash
pub const CODE_LEN: usize = 8;

/// Unambiguous code alphabet (no 0/O/1/I)
const ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// A freshly generated set of backup codes
///
/// `codes` is shown to the user exactly once; `hashes` is what gets
/// persisted.
#[derive(Debug, Clone)]
pub struct BackupCodeSet {
    pub codes: Vec<String>,
    pub hashes: Vec<String>,
}

/// Generate a full set of display codes and their stored digests
pub fn generate() -> BackupCodeSet {
    let mut rng = OsRng;
    let mut codes = Vec::with_capacity(CODE_COUNT);
    let mut hashes = Vec::with_capacity(CODE_COUNT);

    for _ in 0..CODE_COUNT {
        let mut raw = String::with_capacity(CODE_LEN);
        for _ in 0..CODE_LEN {
            let idx = rng.gen_range(0..ALPHABET.len());
            raw.push(ALPHABET[idx] as char);
        }
        hashes.push(hash(&raw));
        codes.push(format!("{}-{}", &raw[..4], &raw[4..]));
    }

    BackupCodeSet { codes, hashes }
}

/// Normalize a user-entered code: uppercase, dashes stripped
pub fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Hex-encoded SHA-256 of the normalized code
pub fn hash(code: &str) -> String {
    let digest = Sha256::digest(normalize(code).as_bytes());
    hex_encode(&digest)
}

/// Verify a candidate code against the stored digests
///
/// Scans the whole set without early exit and compares each digest in
/// constant time. Returns the index of the matched digest so the caller
/// can remove it (codes are single-use).
pub fn verify(code: &str, stored_hashes: &[String]) -> Option<usize> {
    let candidate = hash(code);
    let candidate_bytes = candidate.as_bytes();

    let mut matched: Option<usize> = None;
    for (idx, stored) in stored_hashes.iter().enumerate() {
        let equal: bool = stored.as_bytes().ct_eq(candidate_bytes).into();
        if equal && matched.is_none() {
            matched = Some(idx);
        }
    }
    matched
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_set_shape() {
        let set = generate();
        assert_eq!(set.codes.len(), CODE_COUNT);
        assert_eq!(set.hashes.len(), CODE_COUNT);

        for code in &set.codes {
            assert_eq!(code.len(), CODE_LEN + 1);
            assert_eq!(code.chars().nth(4), Some('-'));
            for c in code.chars().filter(|c| *c != '-') {
                assert!(ALPHABET.contains(&(c as u8)), "unexpected char {c}");
            }
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("abcd-efgh"), "ABCDEFGH");
        assert_eq!(normalize("ABCDEFGH"), "ABCDEFGH");
    }

    #[test]
    fn test_verify_accepts_display_and_raw_forms() {
        let set = generate();
        let code = &set.codes[3];

        assert_eq!(verify(code, &set.hashes), Some(3));
        assert_eq!(verify(&normalize(code), &set.hashes), Some(3));
        assert_eq!(verify(&code.to_lowercase(), &set.hashes), Some(3));
    }

    #[test]
    fn test_verify_rejects_unknown_code() {
        let set = generate();
        assert_eq!(verify("AAAA-AAAA", &set.hashes), None);
    }

    #[test]
    fn test_code_is_single_use_after_removal() {
        let set = generate();
        let code = set.codes[0].clone();
        let mut hashes = set.hashes.clone();

        let idx = verify(&code, &hashes).expect("code must match");
        hashes.remove(idx);

        assert_eq!(verify(&code, &hashes), None);
    }
}
