//! DSR deadline worker
//!
//! Two schedules in one worker: the hourly escalation sweep over open
//! requests, and the 08:00 UTC daily summary. Escalation levels only
//! ever rise; each raise commits with its deadline event per row.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use crate::services::DsrService;
use crate::workers::until_next_utc;

/// Daily summary hour, UTC
const SUMMARY_HOUR: u32 = 8;

/// Escalation sweep cadence
const ESCALATION_INTERVAL: Duration = Duration::from_secs(3600);

pub struct DsrWorker {
    dsr: DsrService,
    shutdown: watch::Receiver<bool>,
}

impl DsrWorker {
    pub fn new(dsr: DsrService, shutdown: watch::Receiver<bool>) -> Self {
        Self { dsr, shutdown }
    }

    pub async fn run(mut self) {
        info!("DSR worker started");
        let mut escalation_ticker = tokio::time::interval(ESCALATION_INTERVAL);
        escalation_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let summary_wait = until_next_utc(Utc::now(), SUMMARY_HOUR, 0);
            tokio::select! {
                _ = escalation_ticker.tick() => {
                    match self.dsr.escalation_sweep(Utc::now()).await {
                        Ok(outcome) if outcome.escalated > 0 => {
                            info!(escalated = outcome.escalated, "DSR escalation sweep finished");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "DSR escalation sweep failed"),
                    }
                }
                _ = tokio::time::sleep(summary_wait) => {
                    if let Err(e) = self.dsr.daily_summary(Utc::now()).await {
                        error!(error = %e, "DSR daily summary failed");
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("DSR worker stopping");
                        break;
                    }
                }
            }
        }
    }
}
