//! Substring search handler
//!
//! Reads a file line by line and prints every line containing the needle as
//! `path:lineno: line`. Lines are treated as raw bytes, so files that are not
//! valid UTF-8 are searched and echoed verbatim.

use crate::error::JobOutcome;
use crate::handler::JobHandler;
use crate::output::SharedOutput;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Prints lines that contain a fixed byte string
pub struct GrepHandler {
    needle: Vec<u8>,
    output: Arc<SharedOutput>,
}

impl GrepHandler {
    /// Create a handler searching for `needle`
    pub fn new(needle: impl Into<Vec<u8>>, output: Arc<SharedOutput>) -> Self {
        Self {
            needle: needle.into(),
            output,
        }
    }

    /// The search string
    pub fn needle(&self) -> &[u8] {
        &self.needle
    }

    /// Scan `reader`, printing matches labelled with `path`
    ///
    /// Returns `(bytes_read, matching_lines)`.
    pub fn search<R: BufRead>(&self, path: &Path, mut reader: R) -> io::Result<(u64, u64)> {
        let label = path.as_os_str().as_encoded_bytes();
        let mut line = Vec::new();
        let mut record = Vec::new();
        let mut lineno: u64 = 0;
        let mut bytes: u64 = 0;
        let mut matches: u64 = 0;

        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            lineno += 1;
            bytes += n as u64;

            let content = line.strip_suffix(b"\n").unwrap_or(&line);
            if !contains(content, &self.needle) {
                continue;
            }
            matches += 1;

            record.clear();
            record.extend_from_slice(label);
            record.extend_from_slice(format!(":{}: ", lineno).as_bytes());
            record.extend_from_slice(content);
            record.push(b'\n');
            self.output.write_record(&record)?;
        }

        Ok((bytes, matches))
    }
}

impl JobHandler for GrepHandler {
    fn handle(&self, path: &Path) -> JobOutcome {
        let result = File::open(path)
            .and_then(|file| self.search(path, BufReader::new(file)));

        match result {
            Ok((bytes, matches)) => JobOutcome::Processed {
                path: path.to_path_buf(),
                bytes,
                matches,
            },
            Err(error) => JobOutcome::Failed {
                path: path.to_path_buf(),
                error,
            },
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
