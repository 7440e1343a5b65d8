//! fk-repro library
//!
//! Reproduces insertion races between a parent table and a child table that
//! references it through a foreign key with `ON DELETE CASCADE`. Both tables
//! are filled by a fixed pool of workers that retry failed inserts until every
//! row is in, or until an optional attempt cap is hit.
//!
//! # CLI Usage
//!
//! ```bash
//! # 500 parent and 500 child inserts, both batches at once
//! fk-repro 500
//!
//! # Parent batch must finish before the child batch starts
//! fk-repro 500 --sequential
//!
//! # Give up on a row after 10 attempts, 8 workers per batch
//! fk-repro 500 --max-attempts 10 --concurrency 8 \
//!   --postgresql-connection-string postgresql://root@127.0.0.1:26257/defaultdb?sslmode=disable
//! ```
//!
//! The engine lives in `repro-core`; this crate wires it to the PostgreSQL
//! collaborators in `repro-postgresql`.

use anyhow::Context;
use repro_core::{AttemptGenerator, BatchCoordinator, Executor, Workload, WorkloadReport};
use repro_postgresql::sql::{CHILD_TABLE, PARENT_TABLE};
use repro_postgresql::{
    row_count, setup_schema, ChildInsert, ConnectionPool, ParentInsert, PostgreSQLExecutor,
    ReproArgs,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod logging;

pub use logging::mask_connection_password;

/// Exit status when every insert of both batches succeeded.
pub const EXIT_COMPLETE: i32 = 0;

/// Exit status when some inserts gave up, were cancelled, or were never assigned.
pub const EXIT_INCOMPLETE: i32 = 3;

/// Build the parent and child batches described by `args` over `executor`.
pub fn build_workload<E>(
    args: &ReproArgs,
    executor: Arc<E>,
    cancel: &CancellationToken,
) -> Workload<E>
where
    E: Executor + 'static,
{
    let parent: Arc<dyn AttemptGenerator> = Arc::new(ParentInsert);
    let child: Arc<dyn AttemptGenerator> = Arc::new(ChildInsert);

    Workload::new(
        BatchCoordinator::new(args.parent_batch(), parent, executor.clone())
            .with_cancellation(cancel.clone()),
        BatchCoordinator::new(args.child_batch(), child, executor)
            .with_cancellation(cancel.clone()),
    )
    .sequential(args.sequential)
}

/// Exit status for a finished run.
pub fn exit_code(report: &WorkloadReport) -> i32 {
    if report.is_complete() {
        EXIT_COMPLETE
    } else {
        EXIT_INCOMPLETE
    }
}

/// A connected reproduction run.
pub struct Repro {
    args: ReproArgs,
    pool: Arc<ConnectionPool>,
}

impl Repro {
    /// Open the connection pool. Failure here is fatal.
    pub async fn connect(args: ReproArgs) -> anyhow::Result<Self> {
        tracing::info!(
            "Connecting to {} ({} connections)",
            mask_connection_password(&args.postgresql_connection_string),
            args.max_connections
        );
        let pool = ConnectionPool::connect(&args.postgresql_connection_string, args.max_connections)
            .await
            .context("Unable to create connection pool")?;

        Ok(Self {
            args,
            pool: Arc::new(pool),
        })
    }

    /// Drop and recreate both tables, unless `--skip-setup` was given.
    pub async fn setup(&self) -> anyhow::Result<()> {
        if self.args.skip_setup {
            tracing::info!("Skipping table setup");
            return Ok(());
        }
        setup_schema(&self.pool)
            .await
            .context("Failed to set up tables")
    }

    /// Run both batches to completion (or cancellation).
    pub async fn run(&self, cancel: &CancellationToken) -> anyhow::Result<WorkloadReport> {
        let executor = Arc::new(PostgreSQLExecutor::new(self.pool.clone()));
        let report = build_workload(&self.args, executor, cancel)
            .run()
            .await
            .context("Insert workload failed")?;

        for shortfall in report.shortfalls() {
            tracing::warn!("Incomplete batch: {}", shortfall);
        }
        for table in [PARENT_TABLE, CHILD_TABLE] {
            match row_count(&self.pool, table).await {
                Ok(rows) => tracing::info!("Table '{}' holds {} rows", table, rows),
                Err(e) => tracing::warn!("Failed to count rows in '{}': {}", table, e),
            }
        }

        Ok(report)
    }
}
