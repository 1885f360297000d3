use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::errors::RetryExhausted;

/// Default attempts before giving up on an item
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Bounded retry loop for fallible per-item work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts
    #[serde(default, with = "millis")]
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff: Duration::ZERO }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Call `operation` with the attempt number (starting at 1) until it
    /// succeeds or attempts run out
    pub fn run<T, E, F>(&self, mut operation: F) -> Result<T, RetryExhausted<E>>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts => {
                    warn!("Attempt {}/{} failed, giving up: {}", attempt, max_attempts, err);
                    return Err(RetryExhausted { attempts: attempt, last: err });
                }
                Err(err) => {
                    warn!("Attempt {}/{} failed, retrying: {}", attempt, max_attempts, err);
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

mod millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_first_attempt_succeeds() {
        let calls = Cell::new(0);
        let result: Result<u32, RetryExhausted<String>> = RetryPolicy::default().run(|attempt| {
            calls.set(calls.get() + 1);
            Ok(attempt)
        });

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_succeeds_after_failures() {
        let result = RetryPolicy::new(5).run(|attempt| if attempt < 3 { Err(format!("attempt {attempt}")) } else { Ok(attempt) });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let result: Result<(), _> = RetryPolicy::new(4).run(|attempt| Err(format!("attempt {attempt}")));

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last, "attempt 4");
        assert_eq!(err.to_string(), "Gave up after 4 attempts: attempt 4");
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy { max_attempts: 0, backoff: Duration::ZERO };
        let _: Result<(), _> = policy.run(|_| {
            calls.set(calls.get() + 1);
            Err("nope")
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_backoff_between_attempts() {
        let policy = RetryPolicy::new(3).with_backoff(Duration::from_millis(20));
        let start = std::time::Instant::now();
        let _: Result<(), _> = policy.run(|_| Err("nope"));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
