//! Repeating poll timer
//!
//! The first cycle runs immediately, then one per interval. A cycle always
//! finishes before the next one starts; ticks missed while it ran are delayed,
//! not replayed.

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, Instrument};

use crate::error::Result;

pub struct PollScheduler {
    interval: Duration,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Run `cycle` on the timer until `shutdown` resolves.
    ///
    /// Cycle errors are logged and the loop keeps going. Returns the number of
    /// cycles started.
    pub async fn run<F, Fut, T, S>(&self, mut cycle: F, shutdown: S) -> u64
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        T: std::fmt::Debug,
        S: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Poll scheduler started (interval: {:?})", self.interval);

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping after {} cycle(s)", cycles);
                    return cycles;
                }
                _ = ticker.tick() => {}
            }

            cycles += 1;
            let span = tracing::info_span!("cycle", n = cycles, cycle_id = %uuid::Uuid::new_v4());

            // Failures are logged inside; the next tick starts from scratch
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested during cycle {}, abandoning it", cycles);
                    return cycles;
                }
                _ = run_logged(&mut cycle).instrument(span) => {}
            }
        }
    }

    /// Run a single cycle
    pub async fn run_once<F, Fut, T>(&self, cycle: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
        T: std::fmt::Debug,
    {
        let span = tracing::info_span!("cycle", n = 1u64, cycle_id = %uuid::Uuid::new_v4());
        async move {
            let result = cycle().await;
            if let Err(e) = &result {
                error!("Poll cycle failed: {}", e);
            }
            result
        }
        .instrument(span)
        .await
    }
}

async fn run_logged<F, Fut, T>(cycle: &mut F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: std::fmt::Debug,
{
    let started = time::Instant::now();
    let result = cycle().await;
    let elapsed_ms = started.elapsed().as_millis();

    match &result {
        Ok(outcome) => tracing::debug!("Cycle finished in {}ms: {:?}", elapsed_ms, outcome),
        Err(e) => error!("Poll cycle failed after {}ms: {}", elapsed_ms, e),
    }
    result
}
