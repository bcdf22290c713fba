//! Worker thread logic for the job pool
//!
//! Each worker:
//! - Pops jobs from the shared bounded queue
//! - Hands each file to the job handler
//! - Exits when the queue reports closed, or on a stop sentinel
//!
//! The handler owns all per-tool logic; a worker only counts outcomes and
//! logs failures, so an unreadable file never takes a worker down.

use crate::error::{JobOutcome, QueueError, WorkerError};
use crate::handler::JobHandler;
use crate::walker::queue::BoundedQueue;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, trace, warn};

/// A unit of work moved through the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// A regular file to hand to the handler
    File(PathBuf),

    /// Legacy "no more work" marker, one per worker
    Stop,
}

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Files handled to completion
    pub files_processed: AtomicU64,

    /// Files that could not be opened or read
    pub files_failed: AtomicU64,

    /// Bytes read from processed files
    pub bytes_read: AtomicU64,

    /// Handler-defined hit count (matching lines for search)
    pub matches: AtomicU64,
}

impl WorkerStats {
    fn record(&self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Processed { bytes, matches, .. } => {
                self.files_processed.fetch_add(1, Ordering::Relaxed);
                self.bytes_read.fetch_add(*bytes, Ordering::Relaxed);
                self.matches.fetch_add(*matches, Ordering::Relaxed);
            }
            JobOutcome::Failed { .. } => {
                self.files_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Totals across every worker in a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub files_processed: u64,
    pub files_failed: u64,
    pub bytes_read: u64,
    pub matches: u64,
}

/// Why a worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `pop` reported the queue closed and drained
    QueueClosed,

    /// A [`Job::Stop`] sentinel was received
    Sentinel,
}

/// Liveness shared by the workers of one pool
///
/// Once every worker has exited and at least one of them panicked, nothing
/// will ever pop again, so the last one out aborts the queue. That releases
/// a producer blocked on a full queue and a closer waiting for the drain.
#[derive(Debug, Default)]
pub(crate) struct PoolHealth {
    live: AtomicUsize,
    panicked: AtomicBool,
}

/// Marks a worker live for as long as its thread runs
struct LiveGuard<'a> {
    id: usize,
    health: &'a PoolHealth,
    queue: &'a BoundedQueue<Job>,
}

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = self.id, "Worker panicked while handling a job");
            self.health.panicked.store(true, Ordering::SeqCst);
        }
        let last = self.health.live.fetch_sub(1, Ordering::SeqCst) == 1;
        if last && self.health.panicked.load(Ordering::SeqCst) {
            let discarded = self.queue.abort();
            warn!(discarded, "No workers left after a panic, aborting job queue");
        }
    }
}

/// A worker thread that processes file jobs
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<ExitReason>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub(crate) fn spawn(
        id: usize,
        queue: Arc<BoundedQueue<Job>>,
        handler: Arc<dyn JobHandler>,
        health: Arc<PoolHealth>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        // Counted before the thread starts so an early exit cannot see zero.
        health.live.fetch_add(1, Ordering::SeqCst);
        let health_clone = Arc::clone(&health);

        let handle = thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || worker_loop(id, queue, handler, health_clone, stats_clone))
            .map_err(|e| {
                health.live.fetch_sub(1, Ordering::SeqCst);
                WorkerError::SpawnFailed {
                    id,
                    reason: e.to_string(),
                }
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<ExitReason, WorkerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| WorkerError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(ExitReason::QueueClosed),
        }
    }
}

/// Fixed set of workers sharing one queue and one handler
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Start `count` workers; they block on the queue until work arrives
    ///
    /// If a spawn fails, the queue is closed so already-started workers can
    /// exit, and the error is returned.
    pub fn spawn(
        count: usize,
        queue: Arc<BoundedQueue<Job>>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Self, WorkerError> {
        let health = Arc::new(PoolHealth::default());
        let mut workers = Vec::with_capacity(count);

        for id in 0..count {
            let spawned = Worker::spawn(
                id,
                Arc::clone(&queue),
                Arc::clone(&handler),
                Arc::clone(&health),
            );
            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    queue.close();
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(e);
                }
            }
        }

        debug!(count = workers.len(), "Workers spawned");
        Ok(Self { workers })
    }

    /// Number of workers in the pool
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Check if the pool has no workers
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Sum of all worker statistics so far
    pub fn stats(&self) -> PoolStats {
        aggregate_stats(self.workers.iter().map(Worker::stats))
    }

    /// Join all worker threads and collect final stats
    ///
    /// Every worker is joined even if one of them panicked; the first panic
    /// is returned after the rest have exited. Stats are summed only after
    /// the joins, so jobs still being handled when the queue drained count.
    pub fn join(self) -> Result<PoolStats, WorkerError> {
        let per_worker: Vec<Arc<WorkerStats>> =
            self.workers.iter().map(|w| Arc::clone(&w.stats)).collect();
        let mut first_error = None;

        for worker in self.workers {
            let id = worker.id();
            match worker.join() {
                Ok(reason) => trace!(worker = id, ?reason, "Worker joined"),
                Err(e) => {
                    warn!(worker = id, error = %e, "Worker failed to join cleanly");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(aggregate_stats(per_worker.iter().map(Arc::as_ref))),
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    queue: Arc<BoundedQueue<Job>>,
    handler: Arc<dyn JobHandler>,
    health: Arc<PoolHealth>,
    stats: Arc<WorkerStats>,
) -> ExitReason {
    let _live = LiveGuard {
        id,
        health: &health,
        queue: &queue,
    };
    debug!(worker = id, "Worker starting");

    let reason = loop {
        let path = match queue.pop() {
            Ok(Job::File(path)) => path,
            Ok(Job::Stop) => break ExitReason::Sentinel,
            Err(QueueError::Closed) => break ExitReason::QueueClosed,
            Err(e) => {
                warn!(worker = id, error = %e, "Unexpected queue error");
                break ExitReason::QueueClosed;
            }
        };

        let outcome = handler.handle(&path);
        stats.record(&outcome);

        match &outcome {
            JobOutcome::Processed { bytes, matches, .. } => {
                trace!(worker = id, path = %path.display(), bytes, matches, "File processed");
            }
            JobOutcome::Failed { error, .. } => {
                warn!(worker = id, path = %path.display(), error = %error, "Skipping unreadable file");
            }
        }
        // `path` is dropped here: the popped job is released after handling.
    };

    debug!(
        worker = id,
        ?reason,
        files = stats.files_processed.load(Ordering::Relaxed),
        failed = stats.files_failed.load(Ordering::Relaxed),
        "Worker shutting down"
    );

    reason
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats<'a>(stats: impl IntoIterator<Item = &'a WorkerStats>) -> PoolStats {
    stats.into_iter().fold(PoolStats::default(), |mut acc, worker| {
        acc.files_processed += worker.files_processed.load(Ordering::Relaxed);
        acc.files_failed += worker.files_failed.load(Ordering::Relaxed);
        acc.bytes_read += worker.bytes_read.load(Ordering::Relaxed);
        acc.matches += worker.matches.load(Ordering::Relaxed);
        acc
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Worker thread panicked".into()
    }
}
