use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tb_app::bulk_load;
use tb_app::bulk_load::LoadOptions;
use tb_app::config_loader::GenerateConfigFile;
use tb_app::generator;
use tb_app::record::Record;
use tb_app::sink::CsvSink;
use tb_app::sink::MemorySink;
use tb_app::sink::RecordSink;
use tb_app::SinkError;
use tb_pool::RetryPolicy;
use tb_ratelimit::Limiter;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("tb_app_{}_{}", std::process::id(), name))
}

/// Fails the first `failures` inserts of every row id
struct FlakySink {
    failures: u32,
    attempts: Mutex<HashMap<String, u32>>,
    inner: MemorySink,
}

impl FlakySink {
    fn new(failures: u32) -> Self {
        Self { failures, attempts: Mutex::new(HashMap::new()), inner: MemorySink::new() }
    }
}

impl RecordSink for FlakySink {
    fn insert(&self, headers: &[String], row: &[String]) -> Result<(), SinkError> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(row[0].clone()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt <= self.failures {
            return Err(SinkError::Rejected(format!("row {} busy", row[0])));
        }
        self.inner.insert(headers, row)
    }
}

/// Accepts only every `every`-th call, counting all of them
struct EveryNthSink {
    every: usize,
    calls: AtomicUsize,
    inner: MemorySink,
}

impl RecordSink for EveryNthSink {
    fn insert(&self, headers: &[String], row: &[String]) -> Result<(), SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % self.every != 0 {
            return Err(SinkError::Rejected(format!("call {call} busy")));
        }
        self.inner.insert(headers, row)
    }
}

/// Clears the running flag once `after` rows have been inserted
struct StoppingSink {
    after: usize,
    running: Arc<AtomicBool>,
    inner: MemorySink,
}

impl RecordSink for StoppingSink {
    fn insert(&self, headers: &[String], row: &[String]) -> Result<(), SinkError> {
        self.inner.insert(headers, row)?;
        if self.inner.len() >= self.after {
            self.running.store(false, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn numbered_input(rows: usize) -> String {
    std::iter::once("ID,Name\n".to_string()).chain((1..=rows).map(|i| format!("{i},Niki\n"))).collect()
}

#[test]
fn test_generate_then_load() {
    let generated = temp_path("generated.csv");
    let loaded = temp_path("loaded.csv");

    let config =
        GenerateConfigFile { output: generated.display().to_string(), entries: 500, workers: 8, ..GenerateConfigFile::default() };
    let summary = generator::generate_csv(&config).unwrap();
    assert_eq!(summary.entries, 500);

    let sink = CsvSink::create(&loaded).unwrap();
    let running = AtomicBool::new(true);
    let options = LoadOptions { workers: 8, ..LoadOptions::default() };
    let summary = bulk_load::load(std::fs::File::open(&generated).unwrap(), &sink, &options, &running).unwrap();
    assert_eq!((summary.rows, summary.inserted, summary.failed), (500, 500, 0));

    let mut reader = csv::Reader::from_path(&loaded).unwrap();
    let mut ids: Vec<u64> = reader.deserialize::<Record>().map(|r| r.unwrap().id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=500).collect::<Vec<_>>());

    let _ = std::fs::remove_file(generated);
    let _ = std::fs::remove_file(loaded);
}

#[test]
fn test_retries_recover_flaky_inserts() {
    let input = numbered_input(40);
    let sink = FlakySink::new(2);
    let running = AtomicBool::new(true);
    let options = LoadOptions { workers: 4, retry: RetryPolicy::new(3), ..LoadOptions::default() };

    let summary = bulk_load::load(input.as_bytes(), &sink, &options, &running).unwrap();

    assert_eq!((summary.rows, summary.inserted, summary.failed), (40, 40, 0));
    assert_eq!(sink.inner.len(), 40);
}

#[test]
fn test_exhausted_rows_are_counted_not_fatal() {
    let input = "ID,Name\n1,Niki\n2,Jojo\n";
    let sink = FlakySink::new(10);
    let running = AtomicBool::new(true);
    let options = LoadOptions { workers: 2, retry: RetryPolicy::new(2), ..LoadOptions::default() };

    let summary = bulk_load::load(input.as_bytes(), &sink, &options, &running).unwrap();

    assert_eq!((summary.rows, summary.inserted, summary.failed), (2, 0, 2));
    assert!(sink.inner.is_empty());
}

#[test]
fn test_limiter_paces_inserts() {
    let input: String = std::iter::once("ID\n".to_string()).chain((1..=25).map(|i| format!("{i}\n"))).collect();
    let sink = MemorySink::new();
    let running = AtomicBool::new(true);
    let limiter = Arc::new(Limiter::new(100.0, 5).unwrap());
    let options = LoadOptions { workers: 6, limiter: Some(limiter), ..LoadOptions::default() };

    let summary = bulk_load::load(input.as_bytes(), &sink, &options, &running).unwrap();

    // 5 from the burst, 20 more at 10ms spacing
    assert_eq!(summary.inserted, 25);
    assert!(summary.elapsed >= Duration::from_millis(190), "took {:?}", summary.elapsed);
}

#[test]
fn test_limiter_admits_every_retry_attempt() {
    let sink = EveryNthSink { every: 5, calls: AtomicUsize::new(0), inner: MemorySink::new() };
    let running = AtomicBool::new(true);
    let limiter = Arc::new(Limiter::new(10.0, 1).unwrap());
    let options = LoadOptions { workers: 1, retry: RetryPolicy::new(5), limiter: Some(limiter), ..LoadOptions::default() };

    let summary = bulk_load::load(numbered_input(3).as_bytes(), &sink, &options, &running).unwrap();

    // 15 calls: one from the burst, fourteen at 100ms spacing
    assert_eq!(sink.calls.load(Ordering::SeqCst), 15);
    assert_eq!((summary.rows, summary.inserted, summary.failed), (3, 3, 0));
    assert!(summary.elapsed >= Duration::from_millis(1350), "15 sink calls in {:?}", summary.elapsed);
}

#[test]
fn test_shutdown_mid_load_drains_queued_rows() {
    let total = 1000;
    let running = Arc::new(AtomicBool::new(true));
    let sink = StoppingSink { after: 20, running: Arc::clone(&running), inner: MemorySink::new() };
    let options = LoadOptions { workers: 2, queue_depth: 4, ..LoadOptions::default() };

    let summary = bulk_load::load(numbered_input(total).as_bytes(), &sink, &options, &running).unwrap();

    assert!(summary.interrupted);
    assert!(summary.rows >= 20 && summary.rows < total, "read {} rows", summary.rows);
    assert_eq!(summary.inserted, summary.rows);
    assert_eq!(summary.failed, 0);

    // Every row read before the stop was inserted, and nothing after it
    let mut ids: Vec<usize> = sink.inner.rows().iter().map(|row| row[0].parse().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=summary.rows).collect::<Vec<_>>());
}
