use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::bucket::Bucket;
use crate::bucket::BucketSnapshot;
use crate::bucket::Reservation;
use crate::config::LimiterConfig;
use crate::error::Result;
use crate::limiter::Admission;
use crate::time::duration_to_nanos;

/// Token bucket limiter for tokio tasks
///
/// Same accounting and single-file admission as [`crate::Limiter`] with the
/// default lock policy: the bucket lock is held across the sleep, so waiting
/// tasks queue in FIFO order behind the sleeper. Time is read from tokio's
/// clock, which makes paused-time tests deterministic.
pub struct AsyncLimiter {
    state: Mutex<Bucket>,
    epoch: Instant,
    rate: f64,
    capacity: u32,
}

impl AsyncLimiter {
    pub fn new(rate: f64, capacity: u32) -> Result<Self> {
        let epoch = Instant::now();
        let bucket = Bucket::new(rate, capacity, 0)?;
        debug!("Created async limiter: rate {}/s, capacity {}", rate, capacity);

        Ok(Self { state: Mutex::new(bucket), epoch, rate, capacity })
    }

    /// Create a limiter from deserialized configuration
    ///
    /// The lock policy is ignored; async admission always holds the lock.
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        Self::new(config.rate_per_second, config.burst)
    }

    /// Wait until a token is available, then consume it
    pub async fn wait(&self) {
        let mut bucket = self.state.lock().await;
        if let Reservation::NotBefore(next) = bucket.reserve(self.now_nanos()) {
            self.sleep_until(next).await;
            bucket.settle(next);
        }
    }

    /// Wait at most `timeout` for a token
    ///
    /// Expires without consuming when the lock is not acquired in time or the
    /// next token lands after the deadline.
    pub async fn wait_timeout(&self, timeout: Duration) -> Admission {
        let deadline = self.now_nanos().saturating_add(duration_to_nanos(timeout));

        let Ok(mut bucket) = tokio::time::timeout(timeout, self.state.lock()).await else {
            debug!("Bucket lock not acquired within {:?}", timeout);
            return Admission::Expired;
        };

        match bucket.reserve(self.now_nanos()) {
            Reservation::Granted => Admission::Admitted,
            Reservation::NotBefore(next) if next > deadline => {
                debug!("Next token arrives after the {:?} deadline", timeout);
                Admission::Expired
            }
            Reservation::NotBefore(next) => {
                self.sleep_until(next).await;
                bucket.settle(next);
                Admission::Admitted
            }
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub async fn snapshot(&self) -> BucketSnapshot {
        self.state.lock().await.snapshot()
    }

    fn now_nanos(&self) -> u64 {
        duration_to_nanos(self.epoch.elapsed())
    }

    async fn sleep_until(&self, next: u64) {
        let at = self.epoch + Duration::from_nanos(next);
        debug!("Bucket empty, waiting {:?} for next token", at.saturating_duration_since(Instant::now()));
        tokio::time::sleep_until(at).await;
    }
}
