//! Configuration types for job-walker
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros, one parser per tool
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::handler::histogram::DEFAULT_MERGE_INTERVAL;
use clap::{Args, Parser};
use std::path::PathBuf;

/// Queue slots per worker when no explicit size is given
const SLOTS_PER_WORKER: usize = 2;

/// Minimum queue size
const MIN_QUEUE_SIZE: usize = 1;

/// Options shared by both tools
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Number of worker threads
    #[arg(
        short = 'n',
        long = "threads",
        default_value_t = 1,
        allow_negative_numbers = true,
        value_name = "INT"
    )]
    pub threads: i64,

    /// Job queue capacity (default: 2 per worker)
    #[arg(long, value_name = "NUM")]
    pub queue_size: Option<usize>,

    /// Stop workers with one sentinel job each instead of closing the queue
    #[arg(long)]
    pub sentinel: bool,

    /// Print run statistics to stderr when done
    #[arg(short = 's', long)]
    pub stats: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Multi-threaded recursive substring search
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fauxgrep",
    version,
    about = "Multi-threaded recursive substring search",
    long_about = "Recursively walks the given paths (following symbolic links) and prints\n\
                  every line containing NEEDLE as `path:lineno: line`.",
    after_help = "EXAMPLES:\n    \
        fauxgrep TODO src\n    \
        fauxgrep -n 8 'fn main' ~/projects /usr/share/doc"
)]
pub struct GrepArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// String to search for
    #[arg(value_name = "NEEDLE")]
    pub needle: String,

    /// Files or directories to search
    #[arg(value_name = "PATHS", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,
}

/// Multi-threaded bit histogram of file contents
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fhistogram",
    version,
    about = "Multi-threaded bit histogram of file contents",
    long_about = "Recursively walks the given paths (following symbolic links) and shows,\n\
                  for each bit position, how often it is set across all bytes read.",
    after_help = "EXAMPLES:\n    \
        fhistogram /usr/bin\n    \
        fhistogram -n 4 --merge-interval 1000000 data/"
)]
pub struct HistogramArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Bytes between merges into the global histogram
    #[arg(long, default_value_t = DEFAULT_MERGE_INTERVAL, value_name = "BYTES")]
    pub merge_interval: u64,

    /// Files or directories to scan
    #[arg(value_name = "PATHS", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,
}

/// How producers tell workers there is no more work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Close the queue; workers exit when pop reports closed
    Close,

    /// Push one stop job per worker, join, then close to release the queue
    Sentinel,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Roots to traverse
    pub roots: Vec<PathBuf>,

    /// Number of worker threads
    pub worker_count: usize,

    /// Job queue capacity
    pub queue_capacity: usize,

    /// Shutdown protocol
    pub shutdown: ShutdownMode,

    /// Print statistics at the end
    pub show_stats: bool,

    /// Verbose output
    pub verbose: bool,
}

impl WalkConfig {
    /// Validate shared options and build the runtime config
    pub fn from_args(common: CommonArgs, roots: Vec<PathBuf>) -> Result<Self, ConfigError> {
        let worker_count = match usize::try_from(common.threads) {
            Ok(n) if n >= 1 => n,
            _ => {
                return Err(ConfigError::InvalidWorkerCount {
                    count: common.threads,
                })
            }
        };

        let queue_capacity = match common.queue_size {
            Some(size) if size < MIN_QUEUE_SIZE => {
                return Err(ConfigError::InvalidQueueSize {
                    size,
                    min: MIN_QUEUE_SIZE,
                })
            }
            Some(size) => size,
            None => worker_count.saturating_mul(SLOTS_PER_WORKER),
        };

        let shutdown = if common.sentinel {
            ShutdownMode::Sentinel
        } else {
            ShutdownMode::Close
        };

        Ok(Self {
            roots,
            worker_count,
            queue_capacity,
            shutdown,
            show_stats: common.stats,
            verbose: common.verbose,
        })
    }
}

impl GrepArgs {
    /// Split into the runtime config and the search string
    pub fn into_config(self) -> Result<(WalkConfig, String), ConfigError> {
        let config = WalkConfig::from_args(self.common, self.paths)?;
        Ok((config, self.needle))
    }
}

impl HistogramArgs {
    /// Split into the runtime config and the merge interval
    pub fn into_config(self) -> Result<(WalkConfig, u64), ConfigError> {
        if self.merge_interval == 0 {
            return Err(ConfigError::InvalidMergeInterval { bytes: 0 });
        }
        let config = WalkConfig::from_args(self.common, self.paths)?;
        Ok((config, self.merge_interval))
    }
}
