use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use tb_ratelimit::Limiter;
use tracing::debug;
use tracing::error;

use crate::errors::PoolError;
use crate::errors::Result;

/// Default number of items buffered between the producer and the workers
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Outcome of [`WorkerPool::for_each`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    /// Items handled across all workers
    pub processed: usize,

    /// Items handled by each worker, indexed by worker id
    pub per_worker: Vec<usize>,
}

/// Fixed-size pool of handler threads fed from a bounded queue
///
/// Each call to [`WorkerPool::run`] or [`WorkerPool::for_each`] spawns the
/// workers, distributes the inputs, and returns once every item has been
/// handled. With a limiter attached, each item waits for a token immediately
/// before its handler runs.
#[derive(Clone)]
pub struct WorkerPool {
    workers: usize,
    queue_depth: usize,
    limiter: Option<Arc<Limiter>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        Ok(Self { workers, queue_depth: DEFAULT_QUEUE_DEPTH, limiter: None })
    }

    /// Items buffered ahead of the workers; 0 makes every hand-off a rendezvous
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Admit every item through `limiter` before handling it
    pub fn with_limiter(mut self, limiter: Arc<Limiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Handle every input and return the outputs in input order
    ///
    /// The handler receives the worker id and the item.
    pub fn run<I, T, O, F>(&self, inputs: I, handler: F) -> Result<Vec<O>>
    where
        I: IntoIterator<Item = T>,
        T: Send,
        O: Send,
        F: Fn(usize, T) -> O + Sync,
    {
        let (outputs, _) = self.execute(inputs, handler)?;
        Ok(outputs)
    }

    /// Handle every input, discarding outputs
    pub fn for_each<I, T, F>(&self, inputs: I, handler: F) -> Result<PoolReport>
    where
        I: IntoIterator<Item = T>,
        T: Send,
        F: Fn(usize, T) + Sync,
    {
        let (outputs, per_worker) = self.execute(inputs, handler)?;
        Ok(PoolReport { processed: outputs.len(), per_worker })
    }

    fn execute<I, T, O, F>(&self, inputs: I, handler: F) -> Result<(Vec<O>, Vec<usize>)>
    where
        I: IntoIterator<Item = T>,
        T: Send,
        O: Send,
        F: Fn(usize, T) -> O + Sync,
    {
        let (job_tx, job_rx) = bounded::<(usize, T)>(self.queue_depth);
        let (result_tx, result_rx) = unbounded::<(usize, O)>();
        let handler = &handler;
        let limiter = self.limiter.as_deref();

        debug!("Dispatching {} workers", self.workers);

        let (submitted, joined) = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers)
                .map(|worker| {
                    let job_rx = job_rx.clone();
                    let result_tx = result_tx.clone();
                    scope.spawn(move || {
                        let mut handled = 0;
                        for (index, item) in job_rx.iter() {
                            if let Some(limiter) = limiter {
                                limiter.wait();
                            }
                            let output = handler(worker, item);
                            // The receiver outlives the scope
                            let _ = result_tx.send((index, output));
                            handled += 1;
                        }
                        handled
                    })
                })
                .collect();

            // Workers hold the only remaining ends
            drop(job_rx);
            drop(result_tx);

            let mut submitted = 0;
            for (index, item) in inputs.into_iter().enumerate() {
                if job_tx.send((index, item)).is_err() {
                    // Every worker is gone
                    break;
                }
                submitted = index + 1;
            }
            drop(job_tx);

            let joined: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();
            (submitted, joined)
        });

        let mut per_worker = Vec::with_capacity(self.workers);
        for (worker, outcome) in joined.into_iter().enumerate() {
            match outcome {
                Ok(handled) => per_worker.push(handled),
                Err(_) => {
                    error!("Worker {} panicked", worker);
                    return Err(PoolError::WorkerPanicked { worker });
                }
            }
        }

        let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(submitted).collect();
        for (index, output) in result_rx.try_iter() {
            slots[index] = Some(output);
        }
        let outputs: Vec<O> = slots.into_iter().flatten().collect();
        debug!("Pool finished: {} items", outputs.len());

        Ok((outputs, per_worker))
    }
}
