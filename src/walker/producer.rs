//! Tree walker that feeds the job queue
//!
//! Walks each root recursively, following symbolic links and without
//! changing the working directory, and pushes every regular file as a
//! [`Job::File`]. Directories and other entry kinds are skipped. Traversal
//! errors are logged and the walk continues.

use crate::walker::queue::BoundedQueue;
use crate::walker::worker::Job;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Counts from one discovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Regular files pushed to the queue
    pub files_queued: u64,

    /// Entries skipped because they could not be read
    pub walk_errors: u64,

    /// Whether every root was walked to the end
    pub completed: bool,
}

/// Single-threaded producer over a set of roots
pub struct Producer<'a> {
    roots: &'a [PathBuf],
    shutdown: &'a AtomicBool,
}

impl<'a> Producer<'a> {
    /// Create a producer; it stops early once `shutdown` is set
    pub fn new(roots: &'a [PathBuf], shutdown: &'a AtomicBool) -> Self {
        Self { roots, shutdown }
    }

    /// Walk every root, pushing regular files into `queue`
    ///
    /// Blocks whenever the queue is full. Stops early on interrupt or if the
    /// queue has been closed underneath it.
    pub fn run(&self, queue: &BoundedQueue<Job>) -> DiscoveryStats {
        let mut stats = DiscoveryStats::default();

        for root in self.roots {
            debug!(root = %root.display(), "Walking root");

            for entry in WalkDir::new(root).follow_links(true) {
                if self.shutdown.load(Ordering::Relaxed) {
                    debug!("Discovery interrupted");
                    return stats;
                }

                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        stats.walk_errors += 1;
                        warn!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                if queue.push(Job::File(entry.into_path())).is_err() {
                    warn!("Job queue closed during discovery");
                    return stats;
                }
                stats.files_queued += 1;
            }
        }

        stats.completed = true;
        debug!(files = stats.files_queued, errors = stats.walk_errors, "Discovery finished");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn drain(queue: &BoundedQueue<Job>) -> Vec<PathBuf> {
        let mut out = Vec::new();
        while !queue.is_empty() {
            if let Ok(Job::File(path)) = queue.pop() {
                out.push(path);
            }
        }
        out.sort();
        out
    }

    #[test]
    fn test_only_regular_files_are_queued() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), "b").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let queue = BoundedQueue::new(16).unwrap();
        let shutdown = AtomicBool::new(false);
        let roots = vec![dir.path().to_path_buf()];

        let stats = Producer::new(&roots, &shutdown).run(&queue);

        assert!(stats.completed);
        assert_eq!(stats.files_queued, 2);
        assert_eq!(
            drain(&queue),
            vec![dir.path().join("a.txt"), dir.path().join("sub").join("b.txt")]
        );
    }

    #[test]
    fn test_file_root_is_queued_and_missing_root_is_skipped() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("single.txt");
        fs::write(&file, "x").unwrap();

        let queue = BoundedQueue::new(4).unwrap();
        let shutdown = AtomicBool::new(false);
        let roots = vec![dir.path().join("missing"), file.clone()];

        let stats = Producer::new(&roots, &shutdown).run(&queue);

        assert_eq!(stats.walk_errors, 1);
        assert_eq!(stats.files_queued, 1);
        assert_eq!(drain(&queue), vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_followed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner.txt"), "x").unwrap();

        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&target, root.join("link")).unwrap();

        let queue = BoundedQueue::new(4).unwrap();
        let shutdown = AtomicBool::new(false);
        let roots = vec![root.clone()];

        Producer::new(&roots, &shutdown).run(&queue);

        assert_eq!(drain(&queue), vec![root.join("link").join("inner.txt")]);
    }

    #[test]
    fn test_interrupt_stops_discovery() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), "a").unwrap();

        let queue = BoundedQueue::new(4).unwrap();
        let shutdown = AtomicBool::new(true);
        let roots = vec![dir.path().to_path_buf()];

        let stats = Producer::new(&roots, &shutdown).run(&queue);

        assert!(!stats.completed);
        assert_eq!(stats.files_queued, 0);
    }

    #[test]
    fn test_closed_queue_stops_discovery() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), "a").unwrap();

        let queue = BoundedQueue::new(4).unwrap();
        queue.close();
        let shutdown = AtomicBool::new(false);
        let roots = vec![dir.path().to_path_buf()];

        let stats = Producer::new(&roots, &shutdown).run(&queue);

        assert!(!stats.completed);
        assert_eq!(stats.files_queued, 0);
    }
}
