use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// Source of time for the blocking limiter
///
/// Timestamps are nanoseconds since the clock's own epoch. Implementations
/// must be monotonic for the limiter's accounting to stay exact; a clock that
/// steps backwards only ever makes callers wait longer.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since the clock's epoch
    fn now_nanos(&self) -> u64;

    /// Suspend the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Monotonic time tracking for rate limiters
///
/// Uses Instant for monotonic time measurements with nanosecond precision.
#[derive(Debug, Clone, Copy)]
pub struct TimeSource {
    /// Epoch for relative time measurements
    epoch: Instant,
}

impl TimeSource {
    /// Create a new time source with current time as epoch
    #[inline(always)]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Clock for TimeSource {
    #[inline(always)]
    fn now_nanos(&self) -> u64 {
        duration_to_nanos(self.epoch.elapsed())
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Manually driven clock for deterministic tests
///
/// Clones share the same timeline. `sleep` advances the timeline instead of
/// blocking, so a limiter built on this clock never actually suspends.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
    slept: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        self.now.fetch_add(duration_to_nanos(duration), Ordering::SeqCst);
    }

    /// Jump to an absolute timestamp, which may be in the past
    pub fn set_nanos(&self, nanos: u64) {
        self.now.store(nanos, Ordering::SeqCst);
    }

    /// Total time callers have spent in `sleep`
    pub fn total_slept(&self) -> Duration {
        Duration::from_nanos(self.slept.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        let nanos = duration_to_nanos(duration);
        self.slept.fetch_add(nanos, Ordering::SeqCst);
        self.now.fetch_add(nanos, Ordering::SeqCst);
    }
}

/// Nanoseconds per second
pub(crate) const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Convert duration to nanoseconds, saturating at u64::MAX
#[inline(always)]
pub(crate) fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_source() {
        let ts = TimeSource::new();
        let t1 = ts.now_nanos();
        ts.sleep(Duration::from_millis(10));
        let t2 = ts.now_nanos();

        assert!(t2 > t1);
        assert!(t2 - t1 >= 10_000_000);
    }

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        let shared = clock.clone();

        clock.sleep(Duration::from_millis(200));
        assert_eq!(shared.now_nanos(), 200_000_000);
        assert_eq!(shared.total_slept(), Duration::from_millis(200));

        shared.advance(Duration::from_secs(1));
        assert_eq!(clock.now_nanos(), 1_200_000_000);
        assert_eq!(clock.total_slept(), Duration::from_millis(200));
    }

    #[test]
    fn test_manual_clock_can_step_backwards() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        clock.set_nanos(1_000);
        assert_eq!(clock.now_nanos(), 1_000);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(duration_to_nanos(Duration::from_secs(1)), NANOS_PER_SEC);
        assert_eq!(duration_to_nanos(Duration::MAX), u64::MAX);
    }
}
