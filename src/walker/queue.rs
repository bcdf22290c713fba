//! Bounded blocking job queue
//!
//! A fixed-capacity ring buffer guarded by one lock and two condition
//! variables: `not_full` for producers waiting on space and `not_empty` for
//! consumers waiting on work. Closing the queue is a drain-then-close
//! protocol:
//!
//! ```text
//!   Open ──close()──▶ Closing ──count reaches 0──▶ Drained
//!    │                  │                            │
//!  push ok            push → Closed                push → Closed
//!  pop ok             pop serves remaining items   pop → Closed
//! ```
//!
//! # Shutdown precondition
//!
//! [`BoundedQueue::close`] blocks until every queued item has been popped.
//! It must only be called once no producer will push again and while at
//! least one consumer is still popping; otherwise the drain wait has
//! nothing to observe and never returns. When every consumer is gone,
//! [`BoundedQueue::abort`] discards what is left and releases all waiters.

use crate::error::{QueueError, QueueResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, trace};

/// Lifecycle phase of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Push and pop both functional
    Open,

    /// Close requested; pushes rejected, pops drain what is left
    Closing,

    /// Closed and empty; storage released
    Drained,
}

/// Statistics for the job queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Items accepted by push
    pub pushed: AtomicU64,

    /// Items handed out by pop
    pub popped: AtomicU64,

    /// Pushes rejected because the queue was closed
    pub rejected: AtomicU64,

    /// Pushes that had to wait for space (backpressure events)
    pub full_waits: AtomicU64,
}

impl QueueStats {
    /// Get queue throughput (popped items)
    pub fn throughput(&self) -> u64 {
        self.popped.load(Ordering::Relaxed)
    }

    /// Get backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.full_waits.load(Ordering::Relaxed)
    }
}

/// State guarded by the queue lock
struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
    closed: bool,
    drained: bool,
}

impl<T> Ring<T> {
    #[inline]
    fn debug_check(&self, capacity: usize) {
        debug_assert!(self.count <= capacity);
        debug_assert_eq!(
            (self.tail + capacity - self.head) % capacity,
            self.count % capacity
        );
    }
}

/// Fixed-capacity, multi-producer multi-consumer blocking queue
///
/// Items are moved in on [`push`](Self::push) and moved out to exactly one
/// caller of [`pop`](Self::pop). The queue never clones items.
pub struct BoundedQueue<T> {
    capacity: usize,
    ring: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    stats: QueueStats,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// Zero, negative, or out-of-range capacities fail with
    /// [`QueueError::InvalidArgument`]. If the ring buffer cannot be
    /// allocated the result is [`QueueError::ResourceExhausted`].
    pub fn new<C: TryInto<usize>>(capacity: C) -> QueueResult<Self> {
        let capacity = match capacity.try_into() {
            Ok(c) if c > 0 => c,
            _ => return Err(QueueError::InvalidArgument),
        };

        let mut slots: Vec<Option<T>> = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| QueueError::ResourceExhausted { capacity })?;
        slots.resize_with(capacity, || None);

        debug!(capacity, "Job queue created");

        Ok(Self {
            capacity,
            ring: Mutex::new(Ring {
                slots: slots.into_boxed_slice(),
                head: 0,
                tail: 0,
                count: 0,
                closed: false,
                drained: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            stats: QueueStats::default(),
        })
    }

    /// Append an item, blocking while the queue is full
    ///
    /// Returns [`QueueError::Closed`] without inserting if the queue is
    /// closed on entry or gets closed while waiting for space. The rejected
    /// item is dropped.
    pub fn push(&self, item: T) -> QueueResult<()> {
        let mut ring = self.ring.lock();

        if ring.count == self.capacity && !ring.closed {
            self.stats.full_waits.fetch_add(1, Ordering::Relaxed);
            trace!("Queue full, producer waiting");
        }
        while ring.count == self.capacity && !ring.closed {
            self.not_full.wait(&mut ring);
        }

        if ring.closed {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(QueueError::Closed);
        }

        let tail = ring.tail;
        ring.slots[tail] = Some(item);
        ring.tail = (tail + 1) % self.capacity;
        ring.count += 1;
        ring.debug_check(self.capacity);

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remove the oldest item, blocking while the queue is empty and open
    ///
    /// Items still queued when the queue is closed are served normally.
    /// Returns [`QueueError::Closed`] only once the queue is closed and
    /// empty, after which every further call returns it too.
    pub fn pop(&self) -> QueueResult<T> {
        let mut ring = self.ring.lock();

        while ring.count == 0 && !ring.closed {
            self.not_empty.wait(&mut ring);
        }

        if ring.count == 0 {
            return Err(QueueError::Closed);
        }

        let head = ring.head;
        let Some(item) = ring.slots[head].take() else {
            error!(head, count = ring.count, "Ring slot below count is empty");
            return Err(QueueError::Closed);
        };
        ring.head = (head + 1) % self.capacity;
        ring.count -= 1;
        ring.debug_check(self.capacity);

        self.stats.popped.fetch_add(1, Ordering::Relaxed);

        // While closing, the closer waits on `not_full` alongside any pushers
        // that were blocked before close; wake them all so the closer cannot
        // lose its wakeup to a pusher that is about to bail out.
        if ring.closed {
            self.not_full.notify_all();
        } else {
            self.not_full.notify_one();
        }

        Ok(item)
    }

    /// Reject further pushes, wait for the queue to drain, then release it
    ///
    /// Blocks until all queued items have been popped by running consumers,
    /// then wakes every consumer blocked on an empty queue (their `pop`
    /// returns [`QueueError::Closed`]) and frees the ring buffer.
    ///
    /// Callers must stop pushing before calling this; a producer that keeps
    /// refilling the queue can keep the drain wait from ever finishing. See
    /// the module docs.
    pub fn close(&self) {
        let mut ring = self.ring.lock();

        if !ring.closed {
            ring.closed = true;
            debug!(pending = ring.count, "Job queue closing");
        }

        // Producers blocked on a full queue fail fast.
        self.not_full.notify_all();

        while ring.count > 0 {
            self.not_full.wait(&mut ring);
        }

        self.not_empty.notify_all();

        if !ring.drained {
            ring.slots = Box::default();
            ring.head = 0;
            ring.tail = 0;
            ring.drained = true;
            debug!(
                pushed = self.stats.pushed.load(Ordering::Relaxed),
                popped = self.stats.popped.load(Ordering::Relaxed),
                "Job queue drained"
            );
        }
    }

    /// Close the queue immediately, dropping anything still queued
    ///
    /// For when no consumer is left to drain it. Blocked pushers, blocked
    /// poppers and a caller waiting in [`close`](Self::close) all return.
    /// Returns the number of items discarded.
    pub fn abort(&self) -> usize {
        let mut ring = self.ring.lock();

        let discarded = ring.count;
        ring.closed = true;
        ring.drained = true;
        ring.slots = Box::default();
        ring.head = 0;
        ring.tail = 0;
        ring.count = 0;

        self.not_full.notify_all();
        self.not_empty.notify_all();

        debug!(discarded, "Job queue aborted");
        discarded
    }

    /// Current lifecycle phase
    pub fn state(&self) -> QueueState {
        let ring = self.ring.lock();
        match (ring.closed, ring.drained) {
            (false, _) => QueueState::Open,
            (true, false) => QueueState::Closing,
            (true, true) => QueueState::Drained,
        }
    }

    /// Check if close has been requested
    pub fn is_closed(&self) -> bool {
        self.ring.lock().closed
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.ring.lock().count
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const SETTLE: Duration = Duration::from_millis(150);
    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_rejects_non_positive_capacity() {
        assert_eq!(
            BoundedQueue::<u32>::new(0).err(),
            Some(QueueError::InvalidArgument)
        );
        assert_eq!(
            BoundedQueue::<u32>::new(-5).err(),
            Some(QueueError::InvalidArgument)
        );
        assert_eq!(
            BoundedQueue::<u32>::new(-5i64).err(),
            Some(QueueError::InvalidArgument)
        );
    }

    #[test]
    fn test_create_reports_allocation_failure() {
        let result = BoundedQueue::<u64>::new(usize::MAX);
        assert_eq!(
            result.err(),
            Some(QueueError::ResourceExhausted {
                capacity: usize::MAX
            })
        );
    }

    #[test]
    fn test_queue_basic() {
        let queue = BoundedQueue::new(4).unwrap();
        assert_eq!(queue.capacity(), 4);
        assert!(queue.is_empty());
        assert_eq!(queue.state(), QueueState::Open);

        queue.push("a").unwrap();
        queue.push("b").unwrap();
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().unwrap(), "a");
        assert_eq!(queue.pop().unwrap(), "b");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ring_wraps_around() {
        let queue = BoundedQueue::new(3).unwrap();
        let mut next_out = 0;

        for i in 0..20 {
            queue.push(i).unwrap();
            if queue.len() == 3 {
                assert_eq!(queue.pop().unwrap(), next_out);
                next_out += 1;
            }
        }
        while next_out < 20 {
            assert_eq!(queue.pop().unwrap(), next_out);
            next_out += 1;
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_blocks_push_until_pop() {
        let queue = Arc::new(BoundedQueue::new(2).unwrap());
        queue.push('A').unwrap();
        queue.push('B').unwrap();

        let (done_tx, done_rx) = unbounded();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let result = queue.push('C');
                done_tx.send(()).unwrap();
                result
            })
        };

        // push(C) must still be waiting for space
        assert!(done_rx.recv_timeout(SETTLE).is_err());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().unwrap(), 'A');
        done_rx.recv_timeout(PATIENCE).unwrap();
        producer.join().unwrap().unwrap();

        assert_eq!(queue.pop().unwrap(), 'B');
        assert_eq!(queue.pop().unwrap(), 'C');
        assert_eq!(queue.stats().backpressure_count(), 1);
    }

    #[test]
    fn test_single_push_wakes_exactly_one_consumer() {
        let queue = Arc::new(BoundedQueue::new(1).unwrap());
        let (tx, rx) = unbounded();

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                thread::spawn(move || tx.send(queue.pop()).unwrap())
            })
            .collect();

        thread::sleep(SETTLE);
        queue.push("X").unwrap();

        assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), Ok("X"));
        // The other consumer stays blocked
        assert!(rx.recv_timeout(SETTLE).is_err());

        // Closing an empty queue releases it
        queue.close();
        assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), Err(QueueError::Closed));

        for consumer in consumers {
            consumer.join().unwrap();
        }
    }

    #[test]
    fn test_close_waits_for_consumers_to_drain() {
        let queue = Arc::new(BoundedQueue::new(8).unwrap());
        let (tx, rx) = unbounded();

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    loop {
                        match queue.pop() {
                            Ok(item) => {
                                thread::sleep(Duration::from_millis(10));
                                taken.push(item);
                            }
                            Err(e) => {
                                tx.send(e).unwrap();
                                return taken;
                            }
                        }
                    }
                })
            })
            .collect();
        drop(tx);

        for i in 0..5 {
            queue.push(i).unwrap();
        }
        queue.close();

        // Nothing left once close returns
        assert_eq!(queue.stats().popped.load(Ordering::Relaxed), 5);
        assert!(queue.is_empty());
        assert_eq!(queue.state(), QueueState::Drained);

        let mut all: Vec<i32> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);

        let stops: Vec<_> = rx.iter().collect();
        assert_eq!(stops, vec![QueueError::Closed; 3]);
    }

    #[test]
    fn test_push_after_close_fails_fast() {
        let queue = BoundedQueue::new(2).unwrap();
        queue.close();

        assert_eq!(queue.push(1), Err(QueueError::Closed));
        assert_eq!(queue.push(2), Err(QueueError::Closed));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.pop(), Err(QueueError::Closed));
        assert_eq!(queue.stats().rejected.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_pop_serves_remaining_items_while_closing() {
        let queue = Arc::new(BoundedQueue::new(4).unwrap());
        queue.push(10).unwrap();
        queue.push(20).unwrap();

        let closer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.close())
        };

        thread::sleep(SETTLE);
        assert_eq!(queue.state(), QueueState::Closing);
        assert_eq!(queue.push(30), Err(QueueError::Closed));

        assert_eq!(queue.pop(), Ok(10));
        assert_eq!(queue.pop(), Ok(20));
        closer.join().unwrap();

        assert_eq!(queue.pop(), Err(QueueError::Closed));
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_close_releases_producer_blocked_on_full_queue() {
        let queue = Arc::new(BoundedQueue::new(1).unwrap());
        queue.push(1).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };
        thread::sleep(SETTLE);

        let closer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.close())
        };

        assert_eq!(producer.join().unwrap(), Err(QueueError::Closed));

        assert_eq!(queue.pop(), Ok(1));
        closer.join().unwrap();
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_close_is_repeatable() {
        let queue = BoundedQueue::<u8>::new(1).unwrap();
        queue.close();
        queue.close();
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_abort_releases_every_waiter() {
        let queue = Arc::new(BoundedQueue::new(1).unwrap());
        queue.push(1).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };
        thread::sleep(SETTLE);

        // No consumer exists, so this close can only return via abort
        let (done_tx, done_rx) = unbounded();
        let closer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.close();
                done_tx.send(()).unwrap();
            })
        };
        assert!(done_rx.recv_timeout(SETTLE).is_err());

        assert_eq!(queue.abort(), 1);
        done_rx.recv_timeout(PATIENCE).unwrap();
        closer.join().unwrap();

        assert_eq!(producer.join().unwrap(), Err(QueueError::Closed));
        assert_eq!(queue.pop(), Err(QueueError::Closed));
        assert_eq!(queue.push(3), Err(QueueError::Closed));
        assert_eq!(queue.state(), QueueState::Drained);
        assert_eq!(queue.abort(), 0);
    }

    #[test]
    fn test_concurrent_exactly_once_delivery() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;

        let queue = Arc::new(BoundedQueue::new(3).unwrap());

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Ok(item) = queue.pop() {
                        assert!(queue.len() <= queue.capacity());
                        seen.push(item);
                    }
                    seen
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.push(p * PER_PRODUCER + i).unwrap();
                        assert!(queue.len() <= queue.capacity());
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        queue.close();

        let mut unique = HashSet::new();
        let mut total = 0;
        for consumer in consumers {
            for item in consumer.join().unwrap() {
                assert!(unique.insert(item), "item {} delivered twice", item);
                total += 1;
            }
        }
        assert_eq!(total, PRODUCERS * PER_PRODUCER);
        assert_eq!(unique.len(), PRODUCERS * PER_PRODUCER);
    }
}
