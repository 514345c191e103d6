//! Injectable clock
//!
//! All settle delays and polling in bpub go through a [`Clock`] so that
//! tests can run the full publish protocol on virtual time.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::sync::Mutex;
use std::time::Duration;

/// Source of wall-clock time and of (async) sleeping
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the system time and `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct ManualState {
    now: NaiveDateTime,
    slept: Duration,
    sleeps: usize,
}

/// Virtual clock: `sleep` returns immediately and advances `now`
///
/// Used by tests and by dry-run rehearsals, where waiting for real time
/// would only slow things down.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    /// Create a manual clock frozen at `start`
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                slept: Duration::ZERO,
                sleeps: 0,
            }),
        }
    }

    /// Manual clock starting at the current local time
    pub fn starting_now() -> Self {
        Self::new(Local::now().naive_local())
    }

    /// Move virtual time forward without counting it as a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += to_chrono(duration);
    }

    /// Total virtual time spent in `sleep`
    pub fn total_slept(&self) -> Duration {
        self.lock().slept
    }

    /// Number of `sleep` calls observed
    pub fn sleep_count(&self) -> usize {
        self.lock().sleeps
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.lock();
            state.now += to_chrono(duration);
            state.slept += duration;
            state.sleeps += 1;
        }
        tokio::task::yield_now().await;
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let clock = ManualClock::new(start());
        clock.sleep(Duration::from_secs(90)).await;

        assert_eq!(clock.now(), start() + chrono::Duration::seconds(90));
        assert_eq!(clock.total_slept(), Duration::from_secs(90));
        assert_eq!(clock.sleep_count(), 1);
    }

    #[test]
    fn test_manual_clock_advance_is_not_a_sleep() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::from_secs(60));

        assert_eq!(clock.now(), start() + chrono::Duration::minutes(1));
        assert_eq!(clock.sleep_count(), 0);
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_system_clock_sleep_is_real() {
        let clock = SystemClock;
        let before = std::time::Instant::now();
        clock.sleep(Duration::from_millis(10)).await;
        assert!(before.elapsed() >= Duration::from_millis(10));
    }
}
