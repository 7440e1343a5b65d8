//! Statement executor backed by the connection pool.

use crate::pool::ConnectionPool;
use async_trait::async_trait;
use repro_core::{ExecOutcome, Executor, Operation};
use std::sync::Arc;

/// Runs each operation's statement on a pooled connection.
///
/// Any database error (constraint violation, serialization failure, dropped
/// connection) is reported as a retryable failure.
pub struct PostgreSQLExecutor {
    pool: Arc<ConnectionPool>,
}

impl PostgreSQLExecutor {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[async_trait]
impl Executor for PostgreSQLExecutor {
    async fn execute(&self, operation: &Operation) -> ExecOutcome {
        let client = match self.pool.acquire().await {
            Ok(client) => client,
            Err(e) => return ExecOutcome::Failed(e.to_string()),
        };

        match client.execute(operation.statement.as_str(), &[]).await {
            Ok(_) => ExecOutcome::Succeeded,
            Err(e) => ExecOutcome::Failed(describe_error(&e)),
        }
    }
}

/// Include the SQLSTATE when the server reported one.
fn describe_error(e: &tokio_postgres::Error) -> String {
    match e.code() {
        Some(code) => format!("{} ({})", e, code.code()),
        None => e.to_string(),
    }
}
