//! Consent expiry sweeper
//!
//! Runs daily at 02:00 UTC: expiring-soon notices for consents inside
//! the 30-day window, then per-row expiry transitions. Each row commits
//! in its own transaction, so shutdown mid-batch is safe.

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::services::ConsentService;
use crate::workers::until_next_utc;

/// Sweep hour, UTC
const SWEEP_HOUR: u32 = 2;

pub struct ConsentSweeper {
    consents: ConsentService,
    shutdown: watch::Receiver<bool>,
}

impl ConsentSweeper {
    pub fn new(consents: ConsentService, shutdown: watch::Receiver<bool>) -> Self {
        Self { consents, shutdown }
    }

    pub async fn run(mut self) {
        info!("consent sweeper started");

        loop {
            let wait = until_next_utc(Utc::now(), SWEEP_HOUR, 0);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    match self.consents.sweep(Utc::now()).await {
                        Ok(outcome) => info!(
                            notices = outcome.expiring_soon_notices,
                            expired = outcome.expired,
                            "daily consent sweep finished"
                        ),
                        Err(e) => error!(error = %e, "consent sweep failed"),
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("consent sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}
