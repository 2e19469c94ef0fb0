//! Collection cycles
//!
//! A cycle is one `collect` over all identities followed by one registry update. The scheduler runs
//! either a single cycle or a periodic loop whose cycles never overlap and which stops cleanly when the
//! shutdown channel flips to `true`.

use crate::collect::{AppResult, Collector};
use crate::config::AppIdentity;
use crate::metrics::MetricsRegistry;
use chrono::Utc;
use core::time::Duration;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

const LOG_TARGET: &str = " scheduler";

#[derive(Debug, Clone)]
pub struct Scheduler {
    collector: Collector,
    registry: Arc<MetricsRegistry>,
    identities: Arc<[AppIdentity]>,
}

impl Scheduler {
    #[must_use]
    pub fn new(collector: Collector, registry: Arc<MetricsRegistry>, identities: impl Into<Arc<[AppIdentity]>>) -> Self {
        Self {
            collector,
            registry,
            identities: identities.into(),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn identities(&self) -> &[AppIdentity] {
        &self.identities
    }

    /// Run one cycle and return its results in configuration order.
    pub async fn run_once(&self) -> Vec<AppResult> {
        let results = self.collector.collect(&self.identities, Utc::now()).await;
        self.registry.update(&results);

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed == 0 {
            log::info!(target: LOG_TARGET, "Collected rate limits for {} app(s)", results.len());
        } else {
            log::warn!(
                target: LOG_TARGET,
                "Collected rate limits for {} app(s), {failed} failed",
                results.len()
            );
        }

        results
    }

    /// Run a cycle every `interval` until `shutdown` becomes `true` (or its sender goes away), handing
    /// each cycle's results to `on_cycle`.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval delays the next one instead
    /// of causing a burst. A cycle in flight when shutdown is requested runs to completion, and no
    /// further cycle starts. Returns the number of completed cycles.
    pub async fn watch<F>(&self, interval: Duration, mut shutdown: watch::Receiver<bool>, mut on_cycle: F) -> u64
    where
        F: FnMut(&[AppResult]),
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = ticker.tick() => {}
            }

            let results = self.run_once().await;
            cycles += 1;
            on_cycle(&results);

            if *shutdown.borrow() {
                break;
            }
        }

        log::info!(target: LOG_TARGET, "Stopped after {cycles} cycle(s)");
        cycles
    }
}
