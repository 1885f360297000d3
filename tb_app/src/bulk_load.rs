use std::cell::RefCell;
use std::io::Read;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tb_pool::RetryPolicy;
use tb_pool::WorkerPool;
use tb_ratelimit::Limiter;
use tracing::error;
use tracing::info;

use crate::errors::AppError;
use crate::errors::Result;
use crate::sink::RecordSink;

/// How rows are fanned out to the sink
#[derive(Clone)]
pub struct LoadOptions {
    pub workers: usize,
    pub queue_depth: usize,
    pub progress_every: usize,
    pub retry: RetryPolicy,

    /// Every insert attempt, retries included, waits on this limiter first
    pub limiter: Option<Arc<Limiter>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { workers: 4, queue_depth: tb_pool::pool::DEFAULT_QUEUE_DEPTH, progress_every: 100, retry: RetryPolicy::default(), limiter: None }
    }
}

/// Outcome of a bulk load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    /// Data rows read from the input
    pub rows: usize,

    /// Rows the sink accepted
    pub inserted: usize,

    /// Rows that failed on every retry
    pub failed: usize,

    /// Reading stopped early on a shutdown request
    pub interrupted: bool,

    pub elapsed: Duration,
}

/// Stream CSV rows from `input` into `sink` across a worker pool
///
/// The first row is the header. Reading stops at the first malformed row,
/// which is reported as [`AppError::Csv`] once in-flight rows have drained.
/// Clearing `running` stops reading; rows already queued are still inserted.
/// With a limiter set, every call into `sink` is admitted through it.
pub fn load<R: Read>(input: R, sink: &dyn RecordSink, options: &LoadOptions, running: &AtomicBool) -> Result<LoadSummary> {
    let start = Instant::now();
    let mut reader = csv::Reader::from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(AppError::MissingHeader("header row is empty".to_string()));
    }

    // Admission happens per insert attempt below, not per row in the pool
    let pool = WorkerPool::new(options.workers)?.with_queue_depth(options.queue_depth);
    let limiter = options.limiter.as_deref();

    let read_error: RefCell<Option<csv::Error>> = RefCell::new(None);
    let interrupted = AtomicBool::new(false);
    let counters: Vec<AtomicUsize> = (0..options.workers).map(|_| AtomicUsize::new(0)).collect();

    // The record pulled when the flag is first seen clear is dropped unqueued
    let rows = reader
        .records()
        .take_while(|_| {
            let keep_going = running.load(Ordering::Relaxed);
            if !keep_going {
                interrupted.store(true, Ordering::Relaxed);
            }
            keep_going
        })
        .map_while(|record| match record {
            Ok(record) => Some(record.iter().map(str::to_string).collect::<Vec<String>>()),
            Err(err) => {
                *read_error.borrow_mut() = Some(err);
                None
            }
        });

    let outcomes = pool.run(rows, |worker, row| {
        let outcome = options.retry.run(|_| {
            if let Some(limiter) = limiter {
                limiter.wait();
            }
            sink.insert(&headers, &row)
        });
        match outcome {
            Ok(()) => {
                let inserted = counters[worker].fetch_add(1, Ordering::Relaxed) + 1;
                if options.progress_every > 0 && inserted % options.progress_every == 0 {
                    info!("=> worker {} inserted {} rows", worker, inserted);
                }
                true
            }
            Err(err) => {
                error!("Dropping row {:?}: {}", row.first(), err);
                false
            }
        }
    })?;

    sink.flush()?;

    if let Some(err) = read_error.into_inner() {
        return Err(AppError::Csv(err));
    }

    let inserted = outcomes.iter().filter(|&&ok| ok).count();
    let summary = LoadSummary {
        rows: outcomes.len(),
        inserted,
        failed: outcomes.len() - inserted,
        interrupted: interrupted.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };
    info!("Loaded {}/{} rows in {:.2} s", summary.inserted, summary.rows, summary.elapsed.as_secs_f64());

    Ok(summary)
}
