//! Walk coordinator - orchestrates producer, queue, and workers
//!
//! The coordinator is responsible for:
//! - Creating the bounded job queue
//! - Starting the worker pool before discovery begins
//! - Running the producer on the calling thread
//! - Shutting down: close-then-drain, or the legacy per-worker sentinels
//! - Final statistics

use crate::config::{ShutdownMode, WalkConfig};
use crate::error::Result;
use crate::handler::JobHandler;
use crate::walker::producer::Producer;
use crate::walker::queue::BoundedQueue;
use crate::walker::worker::{Job, WorkerPool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of a completed walk
#[derive(Debug, Clone)]
pub struct WalkResult {
    /// Regular files pushed by the producer
    pub files_queued: u64,

    /// Files the handler read to the end
    pub files_processed: u64,

    /// Files that could not be opened or read
    pub files_failed: u64,

    /// Directory entries the walker could not read
    pub walk_errors: u64,

    /// Total bytes read by handlers
    pub bytes_read: u64,

    /// Matching lines (search tool)
    pub matches: u64,

    /// Pushes that waited on a full queue
    pub backpressure_events: u64,

    /// Number of workers
    pub workers: usize,

    /// Time taken for the walk
    pub duration: Duration,

    /// Whether the walk completed (vs was interrupted)
    pub completed: bool,
}

/// Coordinates one producer and a fixed pool of workers
pub struct WalkCoordinator {
    /// Configuration
    config: WalkConfig,

    /// Per-file logic
    handler: Arc<dyn JobHandler>,

    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl WalkCoordinator {
    /// Create a new walk coordinator
    pub fn new(config: WalkConfig, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            config,
            handler,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the walk to completion
    ///
    /// Queue creation and worker spawn failures are returned before any
    /// file is discovered.
    pub fn run(self) -> Result<WalkResult> {
        let start = Instant::now();

        let queue = Arc::new(BoundedQueue::new(self.config.queue_capacity)?);

        info!(
            workers = self.config.worker_count,
            capacity = queue.capacity(),
            roots = self.config.roots.len(),
            "Starting walk"
        );

        let pool = WorkerPool::spawn(
            self.config.worker_count,
            Arc::clone(&queue),
            Arc::clone(&self.handler),
        )?;

        let discovery = Producer::new(&self.config.roots, &self.shutdown).run(&queue);

        let stats = match self.config.shutdown {
            ShutdownMode::Close => {
                // Discovery is over, so nothing races the drain wait.
                queue.close();
                pool.join()?
            }
            ShutdownMode::Sentinel => {
                for _ in 0..pool.len() {
                    // Fails only once the pool has died and aborted the
                    // queue; join below reports why.
                    if queue.push(Job::Stop).is_err() {
                        break;
                    }
                }
                let stats = pool.join()?;
                queue.close();
                stats
            }
        };

        let duration = start.elapsed();
        let completed = discovery.completed && !self.shutdown.load(Ordering::Relaxed);

        debug!(
            pushed = queue.stats().pushed.load(Ordering::Relaxed),
            popped = queue.stats().popped.load(Ordering::Relaxed),
            "Queue released"
        );
        info!(
            files = stats.files_processed,
            failed = stats.files_failed,
            bytes = stats.bytes_read,
            duration_ms = duration.as_millis() as u64,
            completed,
            "Walk completed"
        );

        Ok(WalkResult {
            files_queued: discovery.files_queued,
            files_processed: stats.files_processed,
            files_failed: stats.files_failed,
            walk_errors: discovery.walk_errors,
            bytes_read: stats.bytes_read,
            matches: stats.matches,
            backpressure_events: queue.stats().backpressure_count(),
            workers: self.config.worker_count,
            duration,
            completed,
        })
    }
}

impl WalkResult {
    /// Calculate files per second rate
    pub fn files_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.files_processed as f64 / secs
        } else {
            0.0
        }
    }
}
