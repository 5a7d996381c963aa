use std::sync::{atomic::{AtomicI64, Ordering}, Arc};

use chrono::{DateTime, Utc};

/// Wall-clock source for the tracker.
pub trait Clock {
    /// Epoch milliseconds
    fn now_ms(&self) -> i64;

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self { now_ms: Arc::new(AtomicI64::new(now_ms)) }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Moves the clock forward to `now_ms`. Earlier times are ignored.
    pub fn advance_to(&self, now_ms: i64) {
        self.now_ms.fetch_max(now_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_only_moves_when_told() {
        let clock = ManualClock::new(1_000);
        let shared = clock.clone();
        assert_eq!(clock.now_ms(), 1_000);

        clock.advance(500);
        assert_eq!(shared.now_ms(), 1_500);

        clock.advance_to(1_200);
        assert_eq!(clock.now_ms(), 1_500);
        clock.advance_to(4_000);
        assert_eq!(clock.now_ms(), 4_000);
        assert_eq!(clock.now().timestamp_millis(), 4_000);

        clock.set(0);
        assert_eq!(shared.now_ms(), 0);
    }

    #[test]
    fn system_clock_reads_wall_time() {
        let before = Utc::now().timestamp_millis();
        let now = SystemClock.now_ms();
        assert!(now >= before);
        assert!((SystemClock.now().timestamp_millis() - now).abs() < 60_000);
    }
}
