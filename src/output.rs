//! Shared output context
//!
//! One lock guards both the output writer and the global histogram, so a
//! worker that merges its tally and prints the result does so as a single
//! critical section, and concurrent workers never interleave partial lines.
//!
//! The context is created by the orchestrator and handed to handlers through
//! an `Arc`; tests substitute a [`MemorySink`] for stdout.

use crate::handler::histogram::BitHistogram;
use parking_lot::{Mutex, MutexGuard};
use std::io::{self, Write};
use std::sync::Arc;

/// Everything guarded by the output lock
pub struct OutputState {
    writer: Box<dyn Write + Send>,
    histogram: BitHistogram,
}

impl OutputState {
    /// The output writer
    pub fn writer(&mut self) -> &mut (dyn Write + Send) {
        self.writer.as_mut()
    }

    /// The global histogram
    pub fn histogram(&self) -> &BitHistogram {
        &self.histogram
    }

    /// Fold a local tally into the global histogram, resetting the local one
    pub fn merge_histogram(&mut self, local: &mut BitHistogram) {
        local.merge_into(&mut self.histogram);
    }

    /// Print the global histogram
    ///
    /// With `redraw` the cursor is moved back up afterwards so the next print
    /// overwrites this one in place.
    pub fn print_histogram(&mut self, redraw: bool) -> io::Result<()> {
        self.histogram.render(&mut self.writer, redraw)?;
        self.writer.flush()
    }
}

/// Lock-guarded output sink shared by all workers
pub struct SharedOutput {
    state: Mutex<OutputState>,
}

impl SharedOutput {
    /// Create a context writing to `writer`
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            state: Mutex::new(OutputState {
                writer: Box::new(writer),
                histogram: BitHistogram::default(),
            }),
        }
    }

    /// Create a context writing to the process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Take the output lock
    pub fn lock(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock()
    }

    /// Write one complete record while holding the lock
    pub fn write_record(&self, record: &[u8]) -> io::Result<()> {
        self.lock().writer.write_all(record)
    }

    /// Snapshot of the global histogram
    pub fn histogram(&self) -> BitHistogram {
        self.lock().histogram.clone()
    }

    /// Flush the underlying writer
    pub fn flush(&self) -> io::Result<()> {
        self.lock().writer.flush()
    }
}

/// In-memory writer whose contents can be read back while it is shared
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Contents decoded as UTF-8, lossily
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
