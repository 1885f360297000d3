use tb_pool::PoolError;
use tb_ratelimit::RateLimitError;
use thiserror::Error;

/// Result type for the loader and generator pipelines
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Rate limiter error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Input file has no header row: {0}")]
    MissingHeader(String),
}

/// Failure to store a single row
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The sink refused the row; retrying may succeed
    #[error("Row rejected: {0}")]
    Rejected(String),
}
