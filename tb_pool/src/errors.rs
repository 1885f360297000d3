use thiserror::Error;

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur when running a worker pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Pool configured with zero workers
    #[error("Worker pool needs at least one worker")]
    NoWorkers,

    /// A handler panicked; its item and any items it had not reached are lost
    #[error("Worker {worker} panicked while handling an item")]
    WorkerPanicked { worker: usize },
}

/// A retried operation failed on every attempt
#[derive(Error, Debug)]
#[error("Gave up after {attempts} attempts: {last}")]
pub struct RetryExhausted<E> {
    /// Number of attempts made
    pub attempts: u32,

    /// Error from the final attempt
    pub last: E,
}
