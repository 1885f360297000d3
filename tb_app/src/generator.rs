use std::fs::File;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use tb_pool::WorkerPool;
use tracing::debug;
use tracing::info;

use crate::config_loader::GenerateConfigFile;
use crate::errors::Result;
use crate::record::Record;

const NAMES: [&str; 7] = ["Yofan", "Niki", "Andara", "Yudha", "Ndara", "Jojo", "Jopan"];
const COUNTRIES: [&str; 5] = ["Indonesia", "Japan", "Singapore", "United States", "Germany"];
const ADDRESSES: [&str; 3] = ["JL. Bagus Wakanda", "JL. Jelek Wakanda", "JL. Lumayan Wakanda"];
const COMPANIES: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];

/// Ids generated per pool run; bounds memory for large datasets
const BATCH_SIZE: u64 = 10_000;

/// Build one random record
pub fn random_record<R: Rng + ?Sized>(id: u64, rng: &mut R) -> Record {
    Record {
        id,
        name: pick(&NAMES, rng),
        country: pick(&COUNTRIES, rng),
        address: pick(&ADDRESSES, rng),
        phone_number: format!("+628{}", rng.gen_range(0..100_000_000u32)),
        current_company: format!("Company {}", pick(&COMPANIES, rng)),
        salary: rng.gen::<f64>() * 1_000_000.0,
    }
}

fn pick<R: Rng + ?Sized>(choices: &[&str], rng: &mut R) -> String {
    choices.choose(rng).copied().unwrap_or_default().to_string()
}

/// Outcome of a generation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateSummary {
    pub entries: u64,
    pub elapsed_secs: f64,
}

/// Generate `config.entries` records across the worker pool into a CSV file
pub fn generate_csv(config: &GenerateConfigFile) -> Result<GenerateSummary> {
    let start = Instant::now();
    let file = File::create(&config.output)?;
    let entries = write_records(file, config.entries, config.workers)?;

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!("CSV file generation completed in {:.2} s ({} entries to {})", elapsed_secs, entries, Path::new(&config.output).display());

    Ok(GenerateSummary { entries, elapsed_secs })
}

/// Generate ids `1..=entries` across `workers` threads and write them in id order
pub fn write_records<W: Write>(out: W, entries: u64, workers: usize) -> Result<u64> {
    let pool = WorkerPool::new(workers)?;
    let mut writer = csv::Writer::from_writer(out);
    let mut written = 0;

    for ids in batches(1, entries) {
        debug!("Generating entries {:?}", ids);
        let batch = pool.run(ids, |_, id| random_record(id, &mut rand::thread_rng()))?;
        for record in &batch {
            writer.serialize(record)?;
        }
        written += batch.len() as u64;
    }

    // An empty dataset still gets its header
    if written == 0 {
        writer.write_record(crate::record::HEADERS)?;
    }
    writer.flush()?;

    Ok(written)
}

/// Consecutive id ranges of at most `BATCH_SIZE` covering `first..=last`
fn batches(first: u64, last: u64) -> impl Iterator<Item = RangeInclusive<u64>> {
    let mut next = Some(first);
    std::iter::from_fn(move || {
        let start = next.filter(|&start| start <= last)?;
        let end = start.saturating_add(BATCH_SIZE - 1).min(last);
        next = end.checked_add(1);
        Some(start..=end)
    })
}
