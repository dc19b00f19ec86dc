//! UUIDv7 generation and ordering helpers
//!
//! Version-7 UUIDs embed the wall-clock milliseconds in their top
//! 48 bits, so byte order equals creation order. The helpers here
//! recover the embedded timestamp and compare IDs without allocating.

use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// Generate a new time-ordered UUIDv7
pub fn generate() -> Uuid {
    Uuid::now_v7()
}

/// Extract the embedded millisecond timestamp from a UUIDv7
///
/// Returns the raw milliseconds since the Unix epoch. The value is
/// meaningful only for version-7 IDs; other versions yield garbage.
pub fn timestamp_ms(id: &Uuid) -> i64 {
    let bytes = id.as_bytes();
    let mut ms: i64 = 0;
    for byte in &bytes[..6] {
        ms = (ms << 8) | i64::from(*byte);
    }
    ms
}

/// Extract the embedded timestamp as a UTC datetime
pub fn timestamp(id: &Uuid) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp_ms(id)).single()
}

/// Compare two UUIDv7 values by creation order
///
/// Byte-wise comparison; for v7 IDs this is also chronological order.
pub fn compare(a: &Uuid, b: &Uuid) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_increasing() {
        let mut previous = generate();
        for _ in 0..100 {
            let next = generate();
            assert_ne!(compare(&previous, &next), Ordering::Greater);
            previous = next;
        }
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let before = Utc::now().timestamp_millis();
        let id = generate();
        let after = Utc::now().timestamp_millis();

        let embedded = timestamp_ms(&id);
        assert!(embedded >= before);
        assert!(embedded <= after);

        let dt = timestamp(&id).expect("valid embedded timestamp");
        assert_eq!(dt.timestamp_millis(), embedded);
    }

    #[test]
    fn test_compare_orders_by_time() {
        let earlier = generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = generate();

        assert_eq!(compare(&earlier, &later), Ordering::Less);
        assert_eq!(compare(&later, &earlier), Ordering::Greater);
        assert_eq!(compare(&earlier, &earlier), Ordering::Equal);
    }
}
