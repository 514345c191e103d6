//! Bounded poll-and-wait primitive
//!
//! The remote editor exposes no completion events, so every "wait until the
//! page has caught up" is a check repeated on a backoff schedule until it
//! succeeds or the time budget runs out.
//!
//! ```rust,ignore
//! let mut wait = PollWait::new(clock, policy, "login redirect");
//! loop {
//!     if !still_on_login_page().await? {
//!         break;
//!     }
//!     wait.tick().await?;
//! }
//! ```

use crate::clock::Clock;
use std::time::Duration;
use thiserror::Error;

/// Shortest sleep between checks; a zero interval is raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Backoff schedule and time budget for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Total virtual/real time the wait may consume
    pub timeout: Duration,
    /// Sleep before the second check
    pub initial_interval: Duration,
    /// Upper bound for a single sleep
    pub max_interval: Duration,
    /// Interval growth factor per attempt (1 = fixed interval)
    pub multiplier: u32,
}

impl WaitPolicy {
    /// Exponential backoff (x2) from `initial` up to `max`, bounded by `timeout`
    pub fn backoff(timeout: Duration, initial: Duration, max: Duration) -> Self {
        Self {
            timeout,
            initial_interval: initial,
            max_interval: max,
            multiplier: 2,
        }
    }

    /// Fixed-interval polling bounded by `timeout`
    pub fn fixed(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::backoff(
            Duration::from_secs(10),
            Duration::from_millis(200),
            Duration::from_secs(2),
        )
    }
}

/// A wait ran out of budget before its condition held
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("timed out after {waited:?} ({attempts} polls) waiting for {what}")]
pub struct WaitTimeout {
    /// What was being waited for
    pub what: String,
    /// Time spent sleeping
    pub waited: Duration,
    /// Number of sleeps performed
    pub attempts: u32,
}

/// In-progress bounded wait
pub struct PollWait<'c> {
    clock: &'c dyn Clock,
    policy: WaitPolicy,
    what: String,
    elapsed: Duration,
    interval: Duration,
    attempts: u32,
}

impl<'c> PollWait<'c> {
    /// Start a wait for `what` on `clock`
    pub fn new(clock: &'c dyn Clock, policy: WaitPolicy, what: impl Into<String>) -> Self {
        Self {
            clock,
            interval: policy.initial_interval,
            policy,
            what: what.into(),
            elapsed: Duration::ZERO,
            attempts: 0,
        }
    }

    /// Sleep until the next check is due
    ///
    /// Returns `Err` once the budget is spent; the caller should then stop
    /// polling. Each sleep is at least [`MIN_POLL_INTERVAL`], and the final
    /// sleep is clamped so the total never exceeds the policy timeout.
    pub async fn tick(&mut self) -> Result<(), WaitTimeout> {
        if self.elapsed >= self.policy.timeout {
            tracing::debug!(
                what = %self.what,
                attempts = self.attempts,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Wait budget exhausted"
            );
            return Err(WaitTimeout {
                what: self.what.clone(),
                waited: self.elapsed,
                attempts: self.attempts,
            });
        }

        let remaining = self.policy.timeout - self.elapsed;
        let nap = self.interval.max(MIN_POLL_INTERVAL).min(remaining);
        self.clock.sleep(nap).await;
        self.elapsed += nap;
        self.attempts += 1;

        let grown = self
            .interval
            .max(MIN_POLL_INTERVAL)
            .saturating_mul(self.policy.multiplier.max(1));
        self.interval = grown.min(self.policy.max_interval);
        Ok(())
    }

    /// Time slept so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of sleeps so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Fixed pause after a UI-mutating action
pub async fn settle(clock: &dyn Clock, duration: Duration) {
    if !duration.is_zero() {
        clock.sleep(duration).await;
    }
}
