use crate::error::RateLimitError;
use crate::error::Result;
use crate::time::NANOS_PER_SEC;

/// Outcome of a single admission check against the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// A token was available and has been consumed
    Granted,

    /// The bucket is empty; the next token arrives at this timestamp (nanos)
    NotBefore(u64),
}

/// Read-only view of the bucket's accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSnapshot {
    /// Tokens currently held, in `[0, capacity]`
    pub tokens: u32,

    /// Timestamp (nanos) up to which generation has been accounted for
    pub last_refill_nanos: u64,
}

/// Token bucket state machine with lazy, quantized refill
///
/// The bucket does no locking and reads no clock: callers pass `now` in and
/// serialize access themselves. Tokens are only ever credited in whole
/// periods; the unpaid remainder of a period stays as the gap between
/// `last_refill` and `now`.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Tokens currently available
    tokens: u32,

    /// Maximum number of tokens (burst size)
    capacity: u32,

    /// Time between two generated tokens
    period_nanos: u64,

    /// Point up to which token generation has been accounted for
    last_refill: u64,
}

impl Bucket {
    /// Create a fully charged bucket
    pub fn new(rate: f64, capacity: u32, now: u64) -> Result<Self> {
        let period_nanos = refill_period(rate)?;
        if capacity == 0 {
            return Err(RateLimitError::InvalidConfiguration("capacity must be greater than 0"));
        }

        Ok(Self { tokens: capacity, capacity, period_nanos, last_refill: now })
    }

    /// Try to take one token at `now`
    #[inline]
    pub fn reserve(&mut self, now: u64) -> Reservation {
        // Burst fast path
        if self.tokens > 0 {
            self.tokens -= 1;
            return Reservation::Granted;
        }

        self.refill(now);

        if self.tokens > 0 {
            self.tokens -= 1;
            return Reservation::Granted;
        }

        Reservation::NotBefore(self.last_refill.saturating_add(self.period_nanos))
    }

    /// Account for a token consumed at `next`, after sleeping for it
    ///
    /// The token that arrives at `next` is handed straight to the sleeper, so
    /// only the refill point moves.
    #[inline]
    pub fn settle(&mut self, next: u64) {
        self.last_refill = self.last_refill.max(next);
    }

    pub fn snapshot(&self) -> BucketSnapshot {
        BucketSnapshot { tokens: self.tokens, last_refill_nanos: self.last_refill }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn period_nanos(&self) -> u64 {
        self.period_nanos
    }

    /// Credit whole periods elapsed since the last refill
    ///
    /// A `now` behind `last_refill` credits nothing.
    #[inline(always)]
    fn refill(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_refill);
        let generated = elapsed / self.period_nanos;
        if generated == 0 {
            return;
        }

        self.tokens = generated.min(u64::from(self.capacity)) as u32;
        // Advance by whole periods only so the fractional remainder carries over
        self.last_refill += generated * self.period_nanos;
    }
}

/// Refill period for `rate` tokens per second
pub(crate) fn refill_period(rate: f64) -> Result<u64> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateLimitError::InvalidConfiguration("rate must be a finite number greater than 0"));
    }

    let period = (NANOS_PER_SEC as f64 / rate).round();
    if period < 1.0 {
        return Err(RateLimitError::InvalidConfiguration("rate is too high: refill period is below one nanosecond"));
    }
    if period >= u64::MAX as f64 {
        return Err(RateLimitError::InvalidConfiguration("rate is too low: refill period does not fit in u64 nanoseconds"));
    }

    Ok(period as u64)
}
