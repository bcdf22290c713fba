//! Per-file job handlers
//!
//! A handler consumes one file path popped by a worker and produces output
//! through the [`SharedOutput`](crate::output::SharedOutput) it was built
//! with. Handlers are shared by every worker in the pool, so any per-file
//! state lives on the stack of [`JobHandler::handle`].

pub mod grep;
pub mod histogram;

use crate::error::JobOutcome;
use std::path::Path;

pub use grep::GrepHandler;
pub use histogram::{BitHistogram, HistogramHandler};

/// Logic applied to each queued file
pub trait JobHandler: Send + Sync {
    /// Process one file; IO failures are reported, never propagated
    fn handle(&self, path: &Path) -> JobOutcome;
}
