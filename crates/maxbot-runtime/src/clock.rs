//! Time source for the delivery loops.
//!
//! The poller and the staleness check read the time and sleep only through
//! [`Clock`], so tests can drive iterations without real delays.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// Wall-clock time and sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// The system clock with tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A clock that never waits: sleeping records the duration and advances time.
    #[derive(Debug, Default)]
    pub(crate) struct ManualClock {
        pub(crate) now: Mutex<i64>,
        pub(crate) sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub(crate) fn at(now_ms: i64) -> Self {
            Self {
                now: Mutex::new(now_ms),
                sleeps: Mutex::default(),
            }
        }

        pub(crate) fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            *self.now.lock().unwrap() += i64::try_from(duration.as_millis()).unwrap();
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[tokio::test]
    async fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::at(1_000);
        clock.sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.now_ms(), 6_000);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }
}
