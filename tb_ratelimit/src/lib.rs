//! Token bucket admission control.
//!
//! A [`Limiter`] caps the long-run rate of a guarded operation while letting a
//! bounded burst through immediately. Refill is computed lazily on each
//! admission check; there is no background ticker.

pub mod async_limiter;
pub mod bucket;
pub mod config;
pub mod error;
pub mod limiter;
pub mod time;

pub use async_limiter::AsyncLimiter;
pub use bucket::Bucket;
pub use bucket::BucketSnapshot;
pub use bucket::Reservation;
pub use config::LimiterConfig;
pub use error::RateLimitError;
pub use error::Result;
pub use limiter::Admission;
pub use limiter::Limiter;
pub use limiter::LimiterBuilder;
pub use limiter::LockPolicy;
pub use time::Clock;
pub use time::ManualClock;
pub use time::TimeSource;
