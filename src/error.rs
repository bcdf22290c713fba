//! Error types for job-walker
//!
//! This module defines the error hierarchy for:
//! - The bounded job queue (capacity, allocation, shutdown)
//! - Configuration and CLI validation
//! - Worker thread lifecycle
//!
//! Per-file IO failures inside handlers are not errors at this level; they
//! are reported as a [`JobOutcome::Failed`] and the worker moves on.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for the job-walker tools
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Job queue errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (output sink, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by [`BoundedQueue`](crate::walker::BoundedQueue)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Capacity was zero, negative, or not representable
    #[error("Invalid queue capacity: must be a positive integer")]
    InvalidArgument,

    /// Ring buffer storage could not be allocated
    #[error("Failed to allocate queue storage for {capacity} slots")]
    ResourceExhausted { capacity: usize },

    /// The queue has been closed (push), or closed and drained (pop)
    #[error("Queue is closed")]
    Closed,
}

impl QueueError {
    /// `Closed` is a shutdown signal rather than a failure
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed)
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("invalid thread count: {count} (must be at least 1)")]
    InvalidWorkerCount { count: i64 },

    /// Invalid queue size
    #[error("Invalid queue size {size}: must be at least {min}")]
    InvalidQueueSize { size: usize, min: usize },

    /// Invalid histogram merge interval
    #[error("Invalid merge interval {bytes}: must be at least 1 byte")]
    InvalidMergeInterval { bytes: u64 },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread could not be started
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Result type alias for QueueError
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Represents the outcome of handling a single file
#[derive(Debug)]
pub enum JobOutcome {
    /// File was read to the end
    Processed {
        path: PathBuf,
        bytes: u64,
        matches: u64,
    },

    /// File could not be opened or read
    Failed {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl JobOutcome {
    /// Returns true if this outcome represents success
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Processed { .. })
    }

    /// Returns the path associated with this outcome
    pub fn path(&self) -> &Path {
        match self {
            JobOutcome::Processed { path, .. } => path,
            JobOutcome::Failed { path, .. } => path,
        }
    }
}
