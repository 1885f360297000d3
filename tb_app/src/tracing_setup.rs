use std::io;

use serde::Deserialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Logging section of the application config files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the hourly rolling log files
    #[serde(default = "default_log_dir")]
    pub dir: String,

    /// Default level when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Mirror log lines to stdout
    #[serde(default = "default_stdout")]
    pub stdout: bool,
}

impl LoggingConfig {
    /// Configured level, falling back to INFO when it does not parse
    pub fn level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: default_log_dir(), level: default_level(), stdout: default_stdout() }
    }
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_stdout() -> bool {
    true
}

/// Install the global subscriber described by `config`
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background writer.
pub fn init_from_config(app_name: &str, config: &LoggingConfig) -> WorkerGuard {
    init(app_name, &config.dir, config.level(), config.stdout)
}

/// Initialise tracing with a non-blocking hourly file appender, optionally
/// mirrored to stdout
pub fn init(app_name: &str, log_dir: &str, default_level: Level, stdout: bool) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);

    // Background thread handles all file I/O
    let file_appender = tracing_appender::rolling::hourly(log_dir, log_file_name(app_name));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Respects RUST_LOG, falls back to default_level
    let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

    let file_layer =
        fmt::layer().with_writer(non_blocking).with_target(true).with_thread_ids(true).with_line_number(true).with_ansi(false).compact();

    // Thread ids matter here: pool workers interleave
    let stdout_layer =
        stdout.then(|| fmt::layer().with_writer(io::stdout).with_target(false).with_thread_ids(true).with_ansi(true).compact());

    tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();

    guard
}

fn log_file_name(app_name: &str) -> String {
    format!("{app_name}.log")
}
