use std::time::Duration;

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use serde::Deserialize;
use tracing::debug;
use tracing::trace;

use crate::bucket::Bucket;
use crate::bucket::BucketSnapshot;
use crate::bucket::Reservation;
use crate::config::LimiterConfig;
use crate::error::RateLimitError;
use crate::error::Result;
use crate::time::duration_to_nanos;
use crate::time::Clock;
use crate::time::TimeSource;

/// What a waiting caller does with the bucket lock while it sleeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Keep the lock while sleeping for the next token
    ///
    /// Every other caller queues behind the sleeper, so admission is single
    /// file in lock acquisition order.
    #[default]
    HoldAcrossSleep,

    /// Drop the lock while sleeping, then re-check on wake
    ///
    /// Sleepers' wait windows overlap. Throughput is still capped at the rate
    /// but admission order is whoever re-locks first.
    ReleaseDuringSleep,
}

/// Outcome of a deadline-bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A token was consumed
    Admitted,

    /// No token could be had before the deadline; nothing was consumed
    Expired,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Blocking token bucket rate limiter
///
/// Starts fully charged with `capacity` tokens and generates one token every
/// `1 / rate` seconds, computed lazily on each admission check. Share it
/// across threads with `Arc` and call [`Limiter::wait`] immediately before
/// each unit of guarded work.
///
/// With a non-monotonic [`Clock`] a backward jump makes waiters sleep longer;
/// it never raises an error. The default [`TimeSource`] is monotonic.
pub struct Limiter<C: Clock = TimeSource> {
    state: Mutex<Bucket>,
    rate: f64,
    capacity: u32,
    period: Duration,
    lock_policy: LockPolicy,
    clock: C,
}

impl Limiter {
    /// Create a limiter on the monotonic system clock
    pub fn new(rate: f64, capacity: u32) -> Result<Self> {
        Self::with_clock(rate, capacity, TimeSource::new())
    }

    /// Create a builder for configuring a limiter
    pub fn builder() -> LimiterBuilder {
        LimiterBuilder::new()
    }

    /// Create a limiter from deserialized configuration
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        Self::builder().rate_per_second(config.rate_per_second).capacity(config.burst).lock_policy(config.lock_policy).build()
    }
}

impl<C: Clock> Limiter<C> {
    /// Create a limiter on a caller-supplied clock
    pub fn with_clock(rate: f64, capacity: u32, clock: C) -> Result<Self> {
        Self::assemble(rate, capacity, LockPolicy::default(), clock)
    }

    fn assemble(rate: f64, capacity: u32, lock_policy: LockPolicy, clock: C) -> Result<Self> {
        let bucket = Bucket::new(rate, capacity, clock.now_nanos())?;
        debug!("Created limiter: rate {}/s, capacity {}, {:?}", rate, capacity, lock_policy);

        let period = Duration::from_nanos(bucket.period_nanos());

        Ok(Self { state: Mutex::new(bucket), rate, capacity, period, lock_policy, clock })
    }

    /// Block until a token is available, then consume it
    ///
    /// Never fails and cannot be cancelled. See [`Limiter::wait_timeout`] for
    /// a bounded variant.
    pub fn wait(&self) {
        match self.lock_policy {
            LockPolicy::HoldAcrossSleep => {
                let mut bucket = self.state.lock();
                if let Reservation::NotBefore(next) = bucket.reserve(self.clock.now_nanos()) {
                    self.sleep_until(next);
                    bucket.settle(next);
                }
            }
            LockPolicy::ReleaseDuringSleep => loop {
                let next = match self.state.lock().reserve(self.clock.now_nanos()) {
                    Reservation::Granted => break,
                    Reservation::NotBefore(next) => next,
                };
                self.sleep_until(next);
            },
        }
        trace!("Admitted");
    }

    /// Wait at most `timeout` for a token
    ///
    /// Gives up immediately, without consuming anything, when the next token
    /// would arrive after the deadline. Time spent waiting for the bucket lock
    /// counts against the timeout. A zero timeout is a non-blocking try.
    pub fn wait_timeout(&self, timeout: Duration) -> Admission {
        let deadline = self.clock.now_nanos().saturating_add(duration_to_nanos(timeout));

        loop {
            let remaining = Duration::from_nanos(deadline.saturating_sub(self.clock.now_nanos()));
            let Some(mut bucket) = self.lock_within(remaining) else {
                debug!("Bucket lock not acquired within {:?}", timeout);
                return Admission::Expired;
            };

            let next = match bucket.reserve(self.clock.now_nanos()) {
                Reservation::Granted => return Admission::Admitted,
                Reservation::NotBefore(next) if next > deadline => {
                    debug!("Next token arrives after the {:?} deadline", timeout);
                    return Admission::Expired;
                }
                Reservation::NotBefore(next) => next,
            };

            match self.lock_policy {
                LockPolicy::HoldAcrossSleep => {
                    self.sleep_until(next);
                    bucket.settle(next);
                    return Admission::Admitted;
                }
                LockPolicy::ReleaseDuringSleep => {
                    drop(bucket);
                    self.sleep_until(next);
                }
            }
        }
    }

    /// Tokens per second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum burst size
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Time between two generated tokens
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn lock_policy(&self) -> LockPolicy {
        self.lock_policy
    }

    /// Current accounting, without refilling
    ///
    /// Blocks while a caller holds the lock across a sleep.
    pub fn snapshot(&self) -> BucketSnapshot {
        self.state.lock().snapshot()
    }

    fn lock_within(&self, timeout: Duration) -> Option<MutexGuard<'_, Bucket>> {
        if timeout.is_zero() {
            self.state.try_lock()
        } else {
            self.state.try_lock_for(timeout)
        }
    }

    fn sleep_until(&self, next: u64) {
        let now = self.clock.now_nanos();
        if next > now {
            let wait = Duration::from_nanos(next - now);
            debug!("Bucket empty, waiting {:?} for next token", wait);
            self.clock.sleep(wait);
        }
    }
}

/// Builder for configuring a blocking limiter
pub struct LimiterBuilder<C: Clock = TimeSource> {
    capacity: Option<u32>,
    rate: Option<f64>,
    lock_policy: LockPolicy,
    clock: C,
}

impl LimiterBuilder {
    /// Create a new builder on the monotonic system clock
    pub fn new() -> Self {
        Self { capacity: None, rate: None, lock_policy: LockPolicy::default(), clock: TimeSource::new() }
    }
}

impl<C: Clock> LimiterBuilder<C> {
    /// Set the burst capacity (max tokens)
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the refill rate in tokens per second
    pub fn rate_per_second(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set rate in requests per minute
    pub fn rate_per_minute(mut self, rate: f64) -> Self {
        self.rate = Some(rate / 60.0);
        self
    }

    pub fn lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    /// Swap the time source
    pub fn clock<D: Clock>(self, clock: D) -> LimiterBuilder<D> {
        LimiterBuilder { capacity: self.capacity, rate: self.rate, lock_policy: self.lock_policy, clock }
    }

    /// Build the limiter
    pub fn build(self) -> Result<Limiter<C>> {
        let rate = self.rate.ok_or(RateLimitError::InvalidConfiguration("rate must be set"))?;
        let capacity = self.capacity.ok_or(RateLimitError::InvalidConfiguration("capacity must be set"))?;
        Limiter::assemble(rate, capacity, self.lock_policy, self.clock)
    }
}

impl Default for LimiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
