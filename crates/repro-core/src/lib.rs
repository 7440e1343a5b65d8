//! Retry-driven bulk insert engine.
//!
//! A batch of `N` logical operations is split into `C` contiguous partitions.
//! Each partition is driven by one worker task that keeps re-scanning its
//! incomplete indices until every index succeeded, gave up after its attempt
//! budget, or the run was cancelled. Per-operation timings are accumulated in
//! a worker-local [`Stats`] and merged into the batch aggregate exactly once,
//! when the worker finishes.
//!
//! ```text
//!            ┌───────────────────────── Workload ─────────────────────────┐
//!            │                                                            │
//!   parent   │  BatchCoordinator ──► worker 0 [0, n)   ─┐                 │
//!   batch    │                   ──► worker 1 [n, 2n)  ─┼─► SharedStats   │
//!            │                   ──► ...               ─┘   (merge once)  │
//!            │                                                            │
//!            │        (optional barrier: parent join before child)        │
//!            │                                                            │
//!   child    │  BatchCoordinator ──► worker 0 ...      ─► SharedStats     │
//!   batch    │                                                            │
//!            └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database side (statement text, connection handling) is supplied by the
//! caller through the [`AttemptGenerator`] and [`Executor`] traits.

pub mod coordinator;
pub mod error;
pub mod operation;
pub mod partition;
pub mod stats;
pub mod tracker;

pub use coordinator::{
    BatchConfig, BatchCoordinator, BatchReport, Workload, WorkloadReport, DEFAULT_CONCURRENCY,
};
pub use error::CoreError;
pub use operation::{AttemptBudget, AttemptGenerator, ExecOutcome, Executor, Operation};
pub use partition::{
    describe_partitioning, partition_indices, Partition, PartitionPlan, RemainderPolicy,
};
pub use stats::{SharedStats, Stats};
pub use tracker::{IndexOutcome, PartitionReport, PartitionTracker};
