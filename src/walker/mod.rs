//! Producer/consumer file walker
//!
//! # Architecture
//!
//! ```text
//!   ┌────────────────────────┐
//!   │  Producer (tree walk)  │   calling thread
//!   └───────────┬────────────┘
//!               │ push (blocks when full)
//!               ▼
//!   ┌────────────────────────┐
//!   │     BoundedQueue       │   ring buffer + lock
//!   │  not_full / not_empty  │   + two conditions
//!   └───────────┬────────────┘
//!               │ pop (blocks when empty)
//!       ┌───────┼───────────────┐
//!       ▼       ▼               ▼
//!  ┌─────────┐ ┌─────────┐ ┌─────────┐
//!  │Worker 0 │ │Worker 1 │ │Worker N │   JobHandler
//!  └────┬────┘ └────┬────┘ └────┬────┘
//!       └───────────┼───────────┘
//!                   ▼
//!          SharedOutput (one lock)
//! ```

pub mod coordinator;
pub mod producer;
pub mod queue;
pub mod worker;

pub use coordinator::{WalkCoordinator, WalkResult};
pub use producer::{DiscoveryStats, Producer};
pub use queue::{BoundedQueue, QueueState, QueueStats};
pub use worker::{ExitReason, Job, PoolStats, Worker, WorkerPool, WorkerStats};
