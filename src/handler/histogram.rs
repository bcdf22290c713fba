//! Bit histogram handler
//!
//! Each byte of a file contributes one count to bucket `i` for every bit `i`
//! set in it. Workers tally into a local histogram and periodically fold it
//! into the global one held by the shared output, printing the global
//! histogram after every merge.

use crate::error::JobOutcome;
use crate::handler::JobHandler;
use crate::output::SharedOutput;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

/// Number of buckets, one per bit of a byte
pub const BUCKETS: usize = 8;

/// Width of a full bar when one bucket holds every count
const BAR_WIDTH: f64 = 60.0;

/// Bytes between merges into the global histogram
pub const DEFAULT_MERGE_INTERVAL: u64 = 100_000;

/// Per-bit set counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitHistogram {
    buckets: [u64; BUCKETS],
}

impl BitHistogram {
    /// Count the set bits of one byte
    #[inline]
    pub fn update(&mut self, byte: u8) {
        for (bit, bucket) in self.buckets.iter_mut().enumerate() {
            *bucket += u64::from((byte >> bit) & 1);
        }
    }

    /// Add this tally into `global` and reset this one to zero
    pub fn merge_into(&mut self, global: &mut BitHistogram) {
        for (to, from) in global.buckets.iter_mut().zip(self.buckets.iter_mut()) {
            *to += *from;
            *from = 0;
        }
    }

    /// Raw bucket counts
    pub fn buckets(&self) -> &[u64; BUCKETS] {
        &self.buckets
    }

    /// Sum of all buckets
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Write one `Bit i: ***` line per bucket
    ///
    /// Bars are scaled to each bucket's share of the total.
    pub fn render<W: Write + ?Sized>(&self, w: &mut W, redraw: bool) -> io::Result<()> {
        let total = self.total();
        for (bit, &count) in self.buckets.iter().enumerate() {
            let stars = if total == 0 {
                0
            } else {
                (BAR_WIDTH * count as f64 / total as f64).ceil() as usize
            };
            writeln!(w, "Bit {}: {}", bit, "*".repeat(stars))?;
        }
        if redraw {
            write!(w, "\x1b[{}A", BUCKETS)?;
        }
        Ok(())
    }
}

/// Tallies bit frequencies of every file into the shared histogram
pub struct HistogramHandler {
    output: Arc<SharedOutput>,
    merge_interval: u64,
    redraw: bool,
}

impl HistogramHandler {
    /// Create a handler merging every `merge_interval` bytes
    pub fn new(output: Arc<SharedOutput>, merge_interval: u64) -> Self {
        Self {
            output,
            merge_interval: merge_interval.max(1),
            redraw: false,
        }
    }

    /// Redraw the histogram in place (for terminal output)
    pub fn with_redraw(mut self, redraw: bool) -> Self {
        self.redraw = redraw;
        self
    }

    /// Tally `reader`, merging and printing periodically and at the end
    ///
    /// Returns the number of bytes read.
    pub fn tally<R: BufRead>(&self, mut reader: R) -> io::Result<u64> {
        let mut local = BitHistogram::default();
        let mut since_merge: u64 = 0;
        let mut bytes: u64 = 0;

        loop {
            let chunk = reader.fill_buf()?;
            if chunk.is_empty() {
                break;
            }
            let len = chunk.len();
            for &byte in chunk {
                local.update(byte);
                since_merge += 1;
                if since_merge == self.merge_interval {
                    self.merge_and_print(&mut local)?;
                    since_merge = 0;
                }
            }
            bytes += len as u64;
            reader.consume(len);
        }

        self.merge_and_print(&mut local)?;
        Ok(bytes)
    }

    /// Move the cursor below the last in-place histogram
    pub fn finish(&self) -> io::Result<()> {
        let mut out = self.output.lock();
        if self.redraw {
            out.writer().write_all(&[b'\n'; BUCKETS])?;
        }
        out.writer().flush()
    }

    fn merge_and_print(&self, local: &mut BitHistogram) -> io::Result<()> {
        let mut out = self.output.lock();
        out.merge_histogram(local);
        out.print_histogram(self.redraw)
    }
}

impl JobHandler for HistogramHandler {
    fn handle(&self, path: &Path) -> JobOutcome {
        let result = File::open(path).and_then(|file| self.tally(BufReader::new(file)));

        match result {
            Ok(bytes) => JobOutcome::Processed {
                path: path.to_path_buf(),
                bytes,
                matches: 0,
            },
            Err(error) => JobOutcome::Failed {
                path: path.to_path_buf(),
                error,
            },
        }
    }
}
