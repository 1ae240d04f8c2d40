//! Schedule for purging old repaired tickets.
//!
//! The timer does not own the store. The event loop that owns the store waits
//! on [`PurgeTimer::tick`] alongside user input and runs the purge itself, so a
//! purge never overlaps another store operation.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};

/// Default delay between purge runs.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fires once immediately, then every `period`.
#[derive(Debug)]
pub struct PurgeTimer {
    interval: Interval,
    period: Duration,
}

impl PurgeTimer {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until the next purge is due. Cancel-safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

impl Default for PurgeTimer {
    fn default() -> Self {
        Self::new(DEFAULT_PURGE_INTERVAL)
    }
}
