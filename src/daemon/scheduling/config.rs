use std::{ops::RangeInclusive, time::Duration};

use anyhow::{ensure, Result};

pub const DEFAULT_INTERVAL_MINUTES: u64 = 10;
pub const INTERVAL_MINUTES_RANGE: RangeInclusive<u64> = 1..=60;

/// Timing of capture cycles. A cycle waits a random delay in `[0, max_jitter)`, captures, then
/// waits `fixed_delay`. Consecutive captures are therefore between `fixed_delay` and
/// `fixed_delay + max_jitter` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_jitter: Duration,
    pub fixed_delay: Duration,
}

impl SchedulerConfig {
    /// Both the jitter window and the fixed delay equal the interval.
    pub fn from_interval_minutes(minutes: u64) -> Result<Self> {
        ensure!(
            INTERVAL_MINUTES_RANGE.contains(&minutes),
            "Screenshot interval must be between {} and {} minutes, got {minutes}",
            INTERVAL_MINUTES_RANGE.start(),
            INTERVAL_MINUTES_RANGE.end(),
        );
        let interval = Duration::from_secs(minutes * 60);
        Ok(Self {
            max_jitter: interval,
            fixed_delay: interval,
        })
    }

    pub fn max_gap(&self) -> Duration {
        self.fixed_delay + self.max_jitter
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let interval = Duration::from_secs(DEFAULT_INTERVAL_MINUTES * 60);
        Self {
            max_jitter: interval,
            fixed_delay: interval,
        }
    }
}
