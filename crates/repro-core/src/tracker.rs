//! Worker completion tracking.
//!
//! A [`PartitionTracker`] owns the completion state of every index in its
//! partition and keeps scanning the incomplete ones until none is left.

use crate::operation::{AttemptBudget, AttemptGenerator, ExecOutcome, Executor};
use crate::partition::Partition;
use crate::stats::Stats;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Final state of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The executor reported success on the last attempt.
    Succeeded { attempts: u32 },
    /// The attempt budget ran out before any attempt succeeded.
    GaveUp { attempts: u32 },
    /// The run was cancelled before the index succeeded.
    Cancelled { attempts: u32 },
}

impl IndexOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            IndexOutcome::Succeeded { attempts }
            | IndexOutcome::GaveUp { attempts }
            | IndexOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IndexOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CompletionState {
    attempts: u32,
    outcome: Option<IndexOutcome>,
}

/// What a worker hands back once its partition is complete.
#[derive(Debug, Clone)]
pub struct PartitionReport {
    pub partition: Partition,
    /// One outcome per index, in index order.
    pub outcomes: Vec<IndexOutcome>,
    /// Timings of every executor call made by this worker.
    pub stats: Stats,
    /// Number of scan rounds over the partition.
    pub rounds: u32,
}

impl PartitionReport {
    /// Outcome of a batch-global index, if it belongs to this partition.
    pub fn outcome(&self, index: u64) -> Option<IndexOutcome> {
        if !self.partition.range.contains(&index) {
            return None;
        }
        self.outcomes
            .get((index - self.partition.range.start) as usize)
            .copied()
    }

    pub fn invocations(&self) -> u64 {
        self.outcomes.iter().map(|o| o.attempts() as u64).sum()
    }

    pub fn succeeded(&self) -> u64 {
        self.count(|o| matches!(o, IndexOutcome::Succeeded { .. }))
    }

    pub fn gave_up(&self) -> u64 {
        self.count(|o| matches!(o, IndexOutcome::GaveUp { .. }))
    }

    pub fn cancelled(&self) -> u64 {
        self.count(|o| matches!(o, IndexOutcome::Cancelled { .. }))
    }

    /// True when every index of the partition succeeded.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(IndexOutcome::is_success)
    }

    fn count(&self, pred: impl Fn(&IndexOutcome) -> bool) -> u64 {
        self.outcomes.iter().filter(|o| pred(o)).count() as u64
    }
}

/// Drives one partition to completion through repeated scan rounds.
///
/// With an unbounded budget and an executor that never succeeds for some
/// index, [`PartitionTracker::run`] only returns once the cancellation token
/// fires.
pub struct PartitionTracker<G: ?Sized, E: ?Sized> {
    worker: usize,
    partition: Partition,
    generator: Arc<G>,
    executor: Arc<E>,
    budget: AttemptBudget,
    cancel: CancellationToken,
}

impl<G, E> PartitionTracker<G, E>
where
    G: AttemptGenerator + ?Sized,
    E: Executor + ?Sized,
{
    pub fn new(
        partition: Partition,
        generator: Arc<G>,
        executor: Arc<E>,
        budget: AttemptBudget,
    ) -> Self {
        Self {
            worker: partition.worker,
            partition,
            generator,
            executor,
            budget,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next index boundary (or abandon the in-flight call) once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run scan rounds until every index has an outcome, timing each executor call into `stats`.
    pub async fn run(self, mut stats: Stats) -> PartitionReport {
        let start = self.partition.range.start;
        let mut states = vec![CompletionState::default(); self.partition.len() as usize];
        let mut remaining = states.len();
        let mut rounds = 0u32;

        while remaining > 0 {
            rounds += 1;
            let mut failures = 0u64;

            for (offset, state) in states.iter_mut().enumerate() {
                if state.outcome.is_some() {
                    continue;
                }
                let index = start + offset as u64;

                if self.cancel.is_cancelled() {
                    state.outcome = Some(IndexOutcome::Cancelled {
                        attempts: state.attempts,
                    });
                    remaining -= 1;
                    continue;
                }

                if self.budget.is_exhausted(state.attempts) {
                    warn!(
                        "{} worker-{}: giving up on index {} after {} attempts",
                        stats.name(),
                        self.worker,
                        index,
                        state.attempts
                    );
                    state.outcome = Some(IndexOutcome::GaveUp {
                        attempts: state.attempts,
                    });
                    remaining -= 1;
                    continue;
                }

                state.attempts += 1;
                let operation = self.generator.generate(index);

                let outcome = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    outcome = stats.time(self.executor.execute(&operation)) => Some(outcome),
                };

                match outcome {
                    Some(ExecOutcome::Succeeded) => {
                        state.outcome = Some(IndexOutcome::Succeeded {
                            attempts: state.attempts,
                        });
                        remaining -= 1;
                    }
                    Some(ExecOutcome::Failed(reason)) => {
                        failures += 1;
                        trace!(
                            "{} worker-{}: index {} attempt {} failed: {}",
                            stats.name(),
                            self.worker,
                            index,
                            state.attempts,
                            reason
                        );
                    }
                    None => {
                        state.outcome = Some(IndexOutcome::Cancelled {
                            attempts: state.attempts,
                        });
                        remaining -= 1;
                    }
                }
            }

            if remaining > 0 {
                debug!(
                    "{} worker-{}: round {} finished with {} failures, {} indices incomplete",
                    stats.name(),
                    self.worker,
                    rounds,
                    failures,
                    remaining
                );
                tokio::task::yield_now().await;
            }
        }

        let outcomes = states
            .into_iter()
            .map(|state| {
                state.outcome.unwrap_or(IndexOutcome::Cancelled {
                    attempts: state.attempts,
                })
            })
            .collect();

        PartitionReport {
            partition: self.partition,
            outcomes,
            stats,
            rounds,
        }
    }
}
