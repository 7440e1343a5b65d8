//! Capabilities consumed by the engine: turning an index into an operation,
//! and running that operation against a backend.

use async_trait::async_trait;
use std::fmt;

/// One logical operation, produced from its index by an [`AttemptGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Index of the operation within its batch.
    pub index: u64,
    /// Backend-specific statement text (opaque to the engine).
    pub statement: String,
}

impl Operation {
    pub fn new(index: u64, statement: impl Into<String>) -> Self {
        Self {
            index,
            statement: statement.into(),
        }
    }
}

/// Pure mapping from an operation index to the operation to run.
///
/// Implementations must be deterministic: calling `generate(i)` twice yields
/// operations that are equivalent for execution purposes.
pub trait AttemptGenerator: Send + Sync {
    fn generate(&self, index: u64) -> Operation;
}

impl<F> AttemptGenerator for F
where
    F: Fn(u64) -> Operation + Send + Sync,
{
    fn generate(&self, index: u64) -> Operation {
        self(index)
    }
}

/// Result of a single [`Executor::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Succeeded,
    /// Transient failure; the operation will be retried.
    Failed(String),
}

impl ExecOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecOutcome::Succeeded)
    }
}

/// Runs one operation against a shared backend.
///
/// Called concurrently from every worker of every running batch. A failure is
/// a normal, retryable outcome and must never panic.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, operation: &Operation) -> ExecOutcome;
}

/// Maximum number of attempts per index. Zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptBudget(u32);

impl AttemptBudget {
    pub const UNBOUNDED: AttemptBudget = AttemptBudget(0);

    pub fn new(max_attempts: u32) -> Self {
        Self(max_attempts)
    }

    pub fn is_unbounded(&self) -> bool {
        self.0 == 0
    }

    pub fn max_attempts(&self) -> Option<u32> {
        (!self.is_unbounded()).then_some(self.0)
    }

    /// Whether an index that already made `attempts` attempts may not try again.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        !self.is_unbounded() && attempts >= self.0
    }
}

impl fmt::Display for AttemptBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_attempts() {
            Some(n) => write!(f, "{n}"),
            None => write!(f, "unbounded"),
        }
    }
}
