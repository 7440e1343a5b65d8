//! Batch orchestration.
//!
//! [`BatchCoordinator`] partitions one batch, spawns one worker task per
//! partition and joins them, folding each worker's stats into the batch
//! aggregate as it finishes. [`Workload`] runs the parent and child batches
//! either side by side or one after the other.

use crate::error::CoreError;
use crate::operation::{AttemptBudget, AttemptGenerator, Executor};
use crate::partition::{describe_partitioning, partition_indices, RemainderPolicy};
use crate::stats::{SharedStats, Stats};
use crate::tracker::{IndexOutcome, PartitionReport, PartitionTracker};
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of workers per batch.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Configuration of a single batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Batch name, also the label of its stats line.
    pub name: String,
    /// Number of operations `N`; indices are `[0, N)`.
    pub total: u64,
    /// Number of workers `C`.
    pub concurrency: usize,
    /// Attempts allowed per index.
    pub budget: AttemptBudget,
    /// Handling of the `N % C` trailing indices.
    pub remainder: RemainderPolicy,
}

impl BatchConfig {
    pub fn new(name: impl Into<String>, total: u64) -> Self {
        Self {
            name: name.into(),
            total,
            concurrency: DEFAULT_CONCURRENCY,
            budget: AttemptBudget::UNBOUNDED,
            remainder: RemainderPolicy::default(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_budget(mut self, budget: AttemptBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency == 0 {
            return Err(CoreError::Config(format!(
                "batch '{}': concurrency must be at least 1",
                self.name
            )));
        }
        if self.name.is_empty() {
            return Err(CoreError::Config("batch name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Result of a joined batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub name: String,
    pub total: u64,
    /// Per-worker reports, in worker order.
    pub partitions: Vec<PartitionReport>,
    /// Indices that were never assigned to a worker.
    pub uncovered: Range<u64>,
    /// Aggregate of every worker's stats.
    pub stats: Stats,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn workers(&self) -> usize {
        self.partitions.len()
    }

    pub fn outcome(&self, index: u64) -> Option<IndexOutcome> {
        self.partitions.iter().find_map(|p| p.outcome(index))
    }

    pub fn invocations(&self) -> u64 {
        self.partitions.iter().map(PartitionReport::invocations).sum()
    }

    pub fn succeeded(&self) -> u64 {
        self.partitions.iter().map(PartitionReport::succeeded).sum()
    }

    pub fn gave_up(&self) -> u64 {
        self.partitions.iter().map(PartitionReport::gave_up).sum()
    }

    pub fn cancelled(&self) -> u64 {
        self.partitions.iter().map(PartitionReport::cancelled).sum()
    }

    pub fn uncovered_count(&self) -> u64 {
        self.uncovered.end - self.uncovered.start
    }

    /// True only if every index in `[0, N)` succeeded.
    pub fn is_complete(&self) -> bool {
        self.succeeded() == self.total
    }

    /// One-line description of what did not succeed, if anything.
    pub fn shortfall(&self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        Some(format!(
            "{}: {}/{} succeeded, {} gave up, {} cancelled, {} never assigned",
            self.name,
            self.succeeded(),
            self.total,
            self.gave_up(),
            self.cancelled(),
            self.uncovered_count()
        ))
    }
}

/// Runs one batch over a fixed pool of worker tasks.
pub struct BatchCoordinator<G: ?Sized, E: ?Sized> {
    config: BatchConfig,
    generator: Arc<G>,
    executor: Arc<E>,
    cancel: CancellationToken,
}

impl<G, E> BatchCoordinator<G, E>
where
    G: AttemptGenerator + ?Sized + 'static,
    E: Executor + ?Sized + 'static,
{
    pub fn new(config: BatchConfig, generator: Arc<G>, executor: Arc<E>) -> Self {
        Self {
            config,
            generator,
            executor,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Partition, launch one worker per partition, and wait for all of them.
    pub async fn run(&self) -> Result<BatchReport, CoreError> {
        self.config.validate()?;
        let start_time = Instant::now();
        let plan = partition_indices(
            self.config.total,
            self.config.concurrency,
            self.config.remainder,
        )?;

        info!(
            "Starting batch '{}': {} operations, {} workers, max attempts {}",
            self.config.name,
            self.config.total,
            plan.partitions.len(),
            self.config.budget
        );
        debug!("{}", describe_partitioning(&self.config.name, &plan));
        if plan.uncovered_count() > 0 {
            warn!(
                "Batch '{}': {} trailing operations [{}, {}) are not assigned to any worker (remainder policy: {})",
                self.config.name,
                plan.uncovered_count(),
                plan.uncovered.start,
                plan.uncovered.end,
                self.config.remainder
            );
        }

        let shared = SharedStats::new(self.config.name.clone());
        let mut handles = Vec::with_capacity(plan.partitions.len());

        for partition in plan.partitions {
            let worker = partition.worker;
            let tracker = PartitionTracker::new(
                partition,
                self.generator.clone(),
                self.executor.clone(),
                self.config.budget,
            )
            .with_cancellation(self.cancel.clone());
            let shared = shared.clone();

            let handle = tokio::spawn(async move {
                let report = tracker.run(shared.local()).await;
                shared.merge(&report.stats).await;
                report
            });
            handles.push((worker, handle));
        }

        let mut partitions = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for (worker, handle) in handles {
            match handle.await {
                Ok(report) => {
                    debug!(
                        "Batch '{}' worker-{} joined: {} succeeded, {} gave up, {} cancelled in {} rounds",
                        self.config.name,
                        worker,
                        report.succeeded(),
                        report.gave_up(),
                        report.cancelled(),
                        report.rounds
                    );
                    partitions.push(report);
                }
                Err(e) if first_error.is_none() => {
                    first_error = Some(CoreError::WorkerPanicked {
                        batch: self.config.name.clone(),
                        worker,
                        reason: e.to_string(),
                    });
                }
                Err(_) => {}
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let report = BatchReport {
            name: self.config.name.clone(),
            total: self.config.total,
            partitions,
            uncovered: plan.uncovered,
            stats: shared.snapshot().await,
            elapsed: start_time.elapsed(),
        };

        info!(
            "Batch '{}' complete: {}/{} succeeded ({} executor calls) in {:?}",
            report.name,
            report.succeeded(),
            report.total,
            report.invocations(),
            report.elapsed
        );

        Ok(report)
    }
}

/// Results of both batches.
#[derive(Debug, Clone)]
pub struct WorkloadReport {
    pub parent: BatchReport,
    pub child: BatchReport,
}

impl WorkloadReport {
    /// Stats lines to print, skipping batches that recorded nothing.
    pub fn lines(&self) -> Vec<String> {
        [&self.parent, &self.child]
            .into_iter()
            .map(|batch| batch.stats.to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.parent.is_complete() && self.child.is_complete()
    }

    pub fn shortfalls(&self) -> Vec<String> {
        [&self.parent, &self.child]
            .into_iter()
            .filter_map(BatchReport::shortfall)
            .collect()
    }
}

/// Parent and child batches sharing one executor.
pub struct Workload<E: ?Sized> {
    parent: BatchCoordinator<dyn AttemptGenerator, E>,
    child: BatchCoordinator<dyn AttemptGenerator, E>,
    sequential: bool,
}

impl<E> Workload<E>
where
    E: Executor + ?Sized + 'static,
{
    pub fn new(
        parent: BatchCoordinator<dyn AttemptGenerator, E>,
        child: BatchCoordinator<dyn AttemptGenerator, E>,
    ) -> Self {
        Self {
            parent,
            child,
            sequential: false,
        }
    }

    /// When set, the child batch starts only after the parent batch has joined.
    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    pub async fn run(&self) -> Result<WorkloadReport, CoreError> {
        if self.sequential {
            let parent = self.parent.run().await?;
            info!(
                "Parent batch '{}' joined; starting child batch '{}'",
                parent.name,
                self.child.config().name
            );
            let child = self.child.run().await?;
            return Ok(WorkloadReport { parent, child });
        }

        let (parent, child) = tokio::join!(self.parent.run(), self.child.run());
        Ok(WorkloadReport {
            parent: parent?,
            child: child?,
        })
    }
}
