//! job-walker - Parallel file tools over a bounded blocking job queue
//!
//! Two command-line tools share one engine: a single producer walks the
//! given directory trees and pushes every regular file into a fixed-capacity
//! queue, and a fixed pool of worker threads pops files and runs a handler
//! on each.
//!
//! - **fauxgrep**: prints `path:lineno: line` for every line containing a
//!   search string.
//! - **fhistogram**: shows how often each bit position is set across all
//!   bytes read.
//!
//! # Shutdown
//!
//! When discovery ends the producer closes the queue. Closing rejects new
//! pushes, lets workers drain what is already queued, and wakes idle workers
//! once the queue is empty so they exit. A legacy mode stops workers with one
//! sentinel job each instead.
//!
//! # Example
//!
//! ```bash
//! # Search with 8 workers
//! fauxgrep -n 8 'unsafe' ~/src
//!
//! # Bit histogram of a directory
//! fhistogram -n 4 /usr/lib
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod output;
pub mod summary;
pub mod walker;

pub use config::{GrepArgs, HistogramArgs, ShutdownMode, WalkConfig};
pub use error::{Result, WalkerError};
pub use walker::{BoundedQueue, WalkCoordinator, WalkResult};
