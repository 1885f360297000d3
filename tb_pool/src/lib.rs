//! Fan-out/fan-in worker pool with optional rate-limited admission.

pub mod errors;
pub mod pool;
pub mod retry;

pub use errors::PoolError;
pub use errors::Result;
pub use errors::RetryExhausted;
pub use pool::PoolReport;
pub use pool::WorkerPool;
pub use retry::RetryPolicy;
