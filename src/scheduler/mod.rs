//! Clock-aligned dispatch loop.
//!
//! Grounded on the other_examples poller's sleep-until-next-wakeup loop
//! shape: a single `tokio::time::interval` ticks at the finest cadence any
//! job needs (the pre-start sweep's `poll_interval_minutes`), and each tick
//! checks whether the coarser jobs (discovery, midnight) are also due.

pub mod checkpoint;
pub mod correction;
pub mod jobs;

use chrono::{Timelike, Utc};
use tracing::{error, info};

use crate::health::HealthState;
use crate::notifier::Notifier;
use crate::runtime::Runtime;
use crate::upstream::UpstreamClient;

/// Runs discovery, the pre-start sweep, and the midnight result sweep forever,
/// aligned to wall-clock boundaries, until `shutdown` resolves.
pub async fn run(
    runtime: Runtime,
    client: UpstreamClient,
    notifier: Notifier,
    health: HealthState,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) {
    let poll_interval = std::time::Duration::from_secs(runtime.config.poll_interval_minutes * 60);
    let mut tick = tokio::time::interval(poll_interval);

    let correction_cache = runtime.correction_cache.clone();
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            sweep.tick().await;
            correction_cache.sweep().await;
        }
    });

    let mut last_discovery_hour: Option<u32> = None;
    let mut last_midnight_day: Option<u32> = None;

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut shutdown => {
                info!("scheduler received shutdown signal, draining in-flight work");
                break;
            }
        }

        let now = Utc::now();

        if is_due_hourly(now.hour(), runtime.config.discovery_interval_hours as u32, &mut last_discovery_hour) {
            match jobs::run_discovery(&runtime, &client).await {
                Ok(n) => {
                    info!("discovery tick processed {} events", n);
                    health.record_discovery().await;
                }
                Err(e) => {
                    error!("discovery tick failed: {}", e);
                    health.record_error().await;
                }
            }
        }

        match jobs::run_pre_start(&runtime, &client).await {
            Ok(n) => {
                info!("pre-start sweep acted on {} events", n);
                health.record_pre_start().await;
            }
            Err(e) => {
                error!("pre-start sweep failed: {}", e);
                health.record_error().await;
            }
        }

        if now.hour() == 0 && last_midnight_day != Some(now.day_for_dedup()) {
            match jobs::run_midnight(&runtime, &client).await {
                Ok(n) => {
                    info!("midnight sweep collected {} results", n);
                    health.record_midnight().await;
                    last_midnight_day = Some(now.day_for_dedup());
                }
                Err(e) => {
                    error!("midnight sweep failed: {}", e);
                    health.record_error().await;
                }
            }
        }

        if let Err(e) = jobs::run_alerts(&runtime, &notifier, true).await {
            error!("alert evaluation failed: {}", e);
            health.record_error().await;
        }
    }
}

trait DayKey {
    fn day_for_dedup(&self) -> u32;
}

impl DayKey for chrono::DateTime<Utc> {
    fn day_for_dedup(&self) -> u32 {
        use chrono::Datelike;
        self.ordinal()
    }
}

/// Whether the hourly job is due: the job fires once per `interval_hours`,
/// tracked by the last hour it ran so a slow tick doesn't cause a double-fire
/// within the same hour.
fn is_due_hourly(current_hour: u32, interval_hours: u32, last_run_hour: &mut Option<u32>) -> bool {
    let due = current_hour % interval_hours.max(1) == 0;
    if due && *last_run_hour != Some(current_hour) {
        *last_run_hour = Some(current_hour);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_job_fires_once_per_boundary() {
        let mut last = None;
        assert!(is_due_hourly(0, 2, &mut last));
        assert!(!is_due_hourly(0, 2, &mut last));
        assert!(!is_due_hourly(1, 2, &mut last));
        assert!(is_due_hourly(2, 2, &mut last));
    }
}
