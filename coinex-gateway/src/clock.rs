//! Wall clock used for handshake and REST timestamps.

/// Source of the local time in Unix milliseconds.
pub trait Clock: Send + Sync + 'static {
    /// Current local time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub(crate) mod fixed {
    use super::Clock;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// A clock that only moves when told to.
    #[derive(Debug, Default)]
    pub(crate) struct FixedClock(AtomicI64);

    impl FixedClock {
        pub fn new(now_ms: i64) -> Self {
            Self(AtomicI64::new(now_ms))
        }

        pub fn set(&self, now_ms: i64) {
            self.0.store(now_ms, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_plausible() {
        // after 2023-11-01
        assert!(SystemClock.now_millis() > 1_698_796_800_000);
    }
}
