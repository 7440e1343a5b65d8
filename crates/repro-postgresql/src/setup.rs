//! Schema setup and inspection.

use crate::error::PostgreSQLReproError;
use crate::pool::ConnectionPool;
use crate::sql::schema_statements;
use tracing::{debug, info};

/// Drop and recreate the parent and child tables.
///
/// Any failure is fatal: the caller aborts before launching workers.
pub async fn setup_schema(pool: &ConnectionPool) -> Result<(), PostgreSQLReproError> {
    let client = pool.acquire().await?;
    info!("Setting up tables");

    for statement in schema_statements() {
        debug!("DDL: {}", statement);
        client
            .execute(statement.as_str(), &[])
            .await
            .map_err(|source| PostgreSQLReproError::Setup {
                statement: statement.clone(),
                source,
            })?;
    }
    Ok(())
}

/// Get the row count for a table.
pub async fn row_count(
    pool: &ConnectionPool,
    table_name: &str,
) -> Result<u64, PostgreSQLReproError> {
    let client = pool.acquire().await?;
    let sql = format!("SELECT COUNT(*) FROM {table_name}");
    let row = client.query_one(sql.as_str(), &[]).await?;
    let count: i64 = row.get(0);
    Ok(count as u64)
}
