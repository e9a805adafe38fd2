//! Background worker that drops idle document indexes

use adjudicator_store::IndexRegistry;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Runs [`IndexRegistry::sweep_expired`] on a schedule
///
/// Expired entries are also removed lazily on access; the sweeper bounds how
/// long an index nobody asks for stays in memory.
pub struct IndexSweeper {
    registry: Arc<IndexRegistry>,
    interval: Duration,
}

impl IndexSweeper {
    /// Create a sweeper for `registry`
    pub fn new(registry: Arc<IndexRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Run one sweep, returning the number of indexes dropped
    pub fn sweep(&self) -> usize {
        let removed = self.registry.sweep_expired();
        if removed > 0 {
            tracing::info!(
                removed,
                remaining = self.registry.len(),
                "Expired document indexes dropped"
            );
        } else {
            tracing::debug!("Sweep found nothing to expire");
        }
        removed
    }

    /// Run until a shutdown signal (Ctrl+C) is received
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Index sweeper started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping index sweeper");
                    break;
                }
            }
        }

        let stats = self.registry.stats();
        tracing::info!(
            inserted = stats.inserted,
            evicted = stats.evicted,
            expired = stats.expired,
            "Index sweeper stopped"
        );
    }

    /// Run for a specific number of cycles, returning the total dropped
    pub async fn run_cycles(&self, cycles: usize) -> usize {
        let mut ticker = interval(self.interval);
        let mut removed = 0;

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);
            removed += self.sweep();
        }

        removed
    }
}
