use std::time::Duration;

use rand::Rng;

/// Source of the random part of a capture cycle.
pub trait JitterSource: Send + Sync {
    /// Returns a delay in `[0, bound)`. A zero bound yields zero.
    fn next_delay(&mut self, bound: Duration) -> Duration;
}

/// Uniformly distributed delays with millisecond resolution.
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn next_delay(&mut self, bound: Duration) -> Duration {
        let bound_ms = bound.as_millis().min(u64::MAX as u128) as u64;
        if bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..bound_ms))
    }
}

/// Replays a fixed list of delays, wrapping around. Delays are clamped below the bound.
#[cfg(test)]
pub struct SequenceJitter {
    delays: Vec<Duration>,
    next: usize,
}

#[cfg(test)]
impl SequenceJitter {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays, next: 0 }
    }
}

#[cfg(test)]
impl JitterSource for SequenceJitter {
    fn next_delay(&mut self, bound: Duration) -> Duration {
        if self.delays.is_empty() || bound.is_zero() {
            return Duration::ZERO;
        }
        let delay = self.delays[self.next % self.delays.len()];
        self.next += 1;
        delay.min(bound.saturating_sub(Duration::from_millis(1)))
    }
}
