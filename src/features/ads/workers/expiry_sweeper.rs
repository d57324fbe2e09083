use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::error::Result;
use crate::features::ads::repositories::AdRepository;

/// Tally of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired active records found by the selection
    pub scanned: usize,
    /// Records this pass deactivated
    pub deactivated: usize,
    /// Records that changed between selection and update
    pub skipped: usize,
    /// Records whose conditional update errored
    pub failed: usize,
}

/// Deactivates records whose expiry date has passed.
///
/// Every deactivation is a compare-and-set on "still active and expired",
/// so a concurrent manual status change always wins and re-running a pass
/// writes nothing. Overlapping passes race only on those conditional updates.
pub struct ExpirySweeper {
    repository: Arc<dyn AdRepository>,
}

impl ExpirySweeper {
    pub fn new(repository: Arc<dyn AdRepository>) -> Self {
        Self { repository }
    }

    /// Run a single pass against the clock value `now`
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let candidates = self.repository.find_expired_active(now).await?;
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for record in candidates {
            match self
                .repository
                .deactivate_if_expired_and_active(record.id, now)
                .await
            {
                Ok(true) => {
                    tracing::info!(
                        "Deactivated expired ad {} (pole={}, expired={:?})",
                        record.id,
                        record.pole_type,
                        record.expiry_date
                    );
                    report.deactivated += 1;
                }
                Ok(false) => {
                    tracing::debug!("Ad {} changed since selection, skipping", record.id);
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to deactivate expired ad {}: {:?}", record.id, e);
                    report.failed += 1;
                }
            }
        }

        if report.scanned > 0 {
            tracing::info!(
                "Expiry sweep: scanned={}, deactivated={}, skipped={}, failed={}",
                report.scanned,
                report.deactivated,
                report.skipped,
                report.failed
            );
        }

        Ok(report)
    }

    /// Run passes on a fixed period until `shutdown` flips to `true`
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Starting expiry sweeper (every {}s)", period.as_secs());

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once(Utc::now()).await {
                        tracing::error!("Expiry sweep failed: {:?}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }
}
