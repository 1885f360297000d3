use std::path::Path;

use config::Config;
use config::ConfigError;
use config::File;
use serde::Deserialize;
use tb_pool::RetryPolicy;
use tb_ratelimit::LimiterConfig;

use crate::tracing_setup::LoggingConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct BulkLoadConfigFile {
    /// CSV to read, header row first
    pub input: String,

    /// CSV the accepted rows are written to
    pub output: String,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Log a progress line every this many inserts per worker
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Admission limit on inserts; unlimited when absent
    pub limiter: Option<LimiterConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BulkLoadConfigFile {
    fn default() -> Self {
        Self {
            input: "random_data.csv".to_string(),
            output: "loaded_data.csv".to_string(),
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            progress_every: default_progress_every(),
            retry: RetryPolicy::default(),
            limiter: Some(LimiterConfig::default()),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateConfigFile {
    pub output: String,

    pub entries: u64,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GenerateConfigFile {
    fn default() -> Self {
        Self { output: "random_data.csv".to_string(), entries: 1_000_000, workers: default_workers(), logging: LoggingConfig::default() }
    }
}

fn default_workers() -> usize {
    100
}

fn default_queue_depth() -> usize {
    tb_pool::pool::DEFAULT_QUEUE_DEPTH
}

fn default_progress_every() -> usize {
    100
}

pub fn load_bulk_load_config<P: AsRef<Path>>(path: P) -> Result<BulkLoadConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

pub fn load_generate_config<P: AsRef<Path>>(path: P) -> Result<GenerateConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

/// Take a loaded config, or log why not and fall back to defaults
///
/// Split from loading so binaries can set up logging from the loaded file
/// before reporting how the load went.
pub fn or_default<T: Default>(path: &str, loaded: Result<T, ConfigError>) -> T {
    match loaded {
        Ok(config) => {
            tracing::info!("Loaded config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load config from {}: {}. Using defaults.", path, err);
            T::default()
        }
    }
}
