//! Acquisition budget and retry delay helpers.

use std::time::{Duration, Instant};

use rand::Rng;

/// Tracks how much of an acquisition budget has been spent.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    /// Starts a budget at `now`.
    pub fn start(now: Instant, budget: Duration) -> Self {
        Self {
            started: now,
            budget,
        }
    }

    /// The total budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time spent since the budget started.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Time left before the budget runs out.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.budget.saturating_sub(self.elapsed(now))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.budget
    }

    /// Longest one store call may take if started at `now`.
    ///
    /// Capped to the remaining budget, except that a zero budget still grants
    /// its single attempt the full `call_timeout`.
    pub fn attempt_bound(&self, now: Instant, call_timeout: Duration) -> Duration {
        if self.budget.is_zero() {
            call_timeout
        } else {
            call_timeout.min(self.remaining(now))
        }
    }
}

/// Jittered delay between failed attempts.
///
/// Every delay is the base interval ±25%, so contenders that failed together
/// do not retry in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    interval: Duration,
}

impl Backoff {
    /// Jitter as a fraction of the interval, in each direction.
    const JITTER_DIVISOR: u32 = 4;

    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Picks the next delay, never longer than `remaining`.
    pub fn next_delay(&self, remaining: Duration) -> Duration {
        self.jittered(&mut rand::thread_rng()).min(remaining)
    }

    fn jittered<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter_range = self.interval / Self::JITTER_DIVISOR;
        if jitter_range.is_zero() {
            return self.interval;
        }
        let low = self.interval - jitter_range;
        let high = self.interval + jitter_range;
        rng.gen_range(low..=high)
    }
}
