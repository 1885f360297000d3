use std::fs::File;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tb_app::bulk_load;
use tb_app::bulk_load::LoadOptions;
use tb_app::cli;
use tb_app::config_loader;
use tb_app::shutdown_handler;
use tb_app::sink::CsvSink;
use tb_app::tracing_setup;
use tb_ratelimit::Limiter;
use tracing::info;
use tracing::warn;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = cli::config_path("config/bulk_load.toml");
    let loaded = config_loader::load_bulk_load_config(&path);
    let logging = loaded.as_ref().map(|config| config.logging.clone()).unwrap_or_default();
    let _guard = tracing_setup::init_from_config("tb_bulkload", &logging);

    let config = config_loader::or_default(&path, loaded);

    info!("=== CSV Bulk Load ===");
    info!("  Input: {}", config.input);
    info!("  Output: {}", config.output);
    info!("  Workers: {}", config.workers);
    info!("  Max attempts per row: {}", config.retry.max_attempts);

    let limiter = match &config.limiter {
        Some(limiter_config) => {
            info!("  Rate limit: {}/s, burst {}, {:?}", limiter_config.rate_per_second, limiter_config.burst, limiter_config.lock_policy);
            Some(Arc::new(Limiter::from_config(limiter_config)?))
        }
        None => {
            warn!("  Rate limit: none");
            None
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    shutdown_handler::setup(Arc::clone(&running))?;

    info!("==> open csv file");
    let input = File::open(&config.input)?;
    let sink = CsvSink::create(&config.output)?;

    let options = LoadOptions {
        workers: config.workers,
        queue_depth: config.queue_depth,
        progress_every: config.progress_every,
        retry: config.retry,
        limiter,
    };
    let summary = bulk_load::load(input, &sink, &options, &running)?;

    if summary.interrupted {
        warn!("Interrupted after {} rows", summary.rows);
    }
    info!("done in {} seconds: {} inserted, {} failed", summary.elapsed.as_secs_f64().ceil(), summary.inserted, summary.failed);

    Ok(())
}
