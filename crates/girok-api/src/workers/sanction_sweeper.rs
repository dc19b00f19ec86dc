//! Sanction expiry sweeper
//!
//! Runs at least every minute: bulk-moves ACTIVE sanctions whose window
//! has closed to EXPIRED and logs the count. Expiration emits no event;
//! it is derivable from time plus prior state.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use crate::services::SanctionService;

pub struct SanctionSweeper {
    sanctions: SanctionService,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SanctionSweeper {
    pub fn new(
        sanctions: SanctionService,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            sanctions,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!("sanction sweeper started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sanctions.expire_due().await {
                        Ok(0) => {}
                        Ok(expired) => info!(expired, "sanctions expired"),
                        Err(e) => error!(error = %e, "sanction expiry sweep failed"),
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("sanction sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}
