//! # tb_app
//!
//! CSV bulk loader and synthetic data generator built on the worker pool,
//! with inserts admitted through a token bucket limiter.

pub mod bulk_load;
pub mod cli;
pub mod config_loader;
pub mod errors;
pub mod generator;
pub mod record;
pub mod shutdown_handler;
pub mod sink;
pub mod tracing_setup;

pub use errors::AppError;
pub use errors::Result;
pub use errors::SinkError;
