//! Delay sequence between the probes of one validation attempt

use std::time::Duration;

/// Capped geometric delay sequence
///
/// Built from [`BackoffConfig::build`](crate::config::BackoffConfig::build);
/// every attempt gets its own sequence. The sequence is infinite: the number
/// of retries is bounded by the probe policy, not here.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    maximum: Duration,
    multiplier: f64,
}

impl Backoff {
    /// Create a sequence starting at `initial`, never exceeding `maximum`
    pub fn new(initial: Duration, maximum: Duration, multiplier: f64) -> Self {
        Self {
            next: initial.min(maximum),
            maximum,
            multiplier: multiplier.max(1.0),
        }
    }

    /// Next delay to sleep before retrying
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        let grown = current.as_secs_f64() * self.multiplier;
        self.next = if grown >= self.maximum.as_secs_f64() {
            self.maximum
        } else {
            Duration::from_secs_f64(grown)
        };
        current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
