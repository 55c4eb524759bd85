//! Fixed-period cycle trigger.
//!
//! Runs one cycle immediately, then one per period, until the shutdown
//! signal flips. A tick that lands while the previous cycle is still
//! running is absorbed by the collector's own overlap guard.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument};

use crate::pipeline::{Collector, CycleObserver};

/// Drive the collector on a fixed period until shutdown. Returns the
/// number of cycles that actually ran.
#[instrument(skip_all, fields(period_secs = period.as_secs()))]
pub async fn run_scheduled(
    collector: &Collector,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    observer: &dyn CycleObserver,
) -> usize {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut cycles = 0usize;

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                let summary = collector.run_cycle(observer).await;
                if !summary.skipped {
                    cycles += 1;
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender means no more signals are coming.
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(cycles, "scheduler stopped");
    cycles
}
