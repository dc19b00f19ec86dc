//! Background workers
//!
//! Scheduled tasks sharing the request path's transactional discipline:
//! each aggregate updates in its own transaction, so a batch cancelled
//! by shutdown leaves nothing half-applied. Every worker observes the
//! shutdown watch channel and stops after its current batch.

pub mod consent_sweeper;
pub mod dsr_worker;
pub mod outbox_publisher;
pub mod sanction_sweeper;

pub use consent_sweeper::ConsentSweeper;
pub use dsr_worker::DsrWorker;
pub use outbox_publisher::OutboxPublisher;
pub use sanction_sweeper::SanctionSweeper;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::time::Duration;

/// Time until the next daily occurrence of `HH:MM` UTC
pub(crate) fn until_next_utc(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let target_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(target_time).and_utc();

    let next = if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    };

    (next - now)
        .to_std()
        .unwrap_or_else(|_| Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_next_utc_same_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 1, 0, 0).unwrap();
        let wait = until_next_utc(now, 2, 0);
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[test]
    fn test_until_next_utc_rolls_over() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 2, 0, 0).unwrap();
        let wait = until_next_utc(now, 2, 0);
        assert_eq!(wait, Duration::from_secs(24 * 3600));

        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();
        let wait = until_next_utc(now, 8, 0);
        assert_eq!(wait, Duration::from_secs(22 * 3600 + 1800));
    }
}
