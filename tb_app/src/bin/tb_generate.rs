use tb_app::cli;
use tb_app::config_loader;
use tb_app::generator;
use tb_app::tracing_setup;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = cli::config_path("config/generate.toml");
    let loaded = config_loader::load_generate_config(&path);
    let logging = loaded.as_ref().map(|config| config.logging.clone()).unwrap_or_default();
    let _guard = tracing_setup::init_from_config("tb_generate", &logging);

    let config = config_loader::or_default(&path, loaded);

    info!("=== Random CSV Generator ===");
    info!("  Output: {}", config.output);
    info!("  Entries: {}", config.entries);
    info!("  Workers: {}", config.workers);

    let summary = generator::generate_csv(&config)?;
    info!("Wrote {} entries in {:.2} s", summary.entries, summary.elapsed_secs);

    Ok(())
}
