//! PostgreSQL side of the fk-repro workload.
//!
//! Provides the collaborators the engine in `repro-core` consumes: a bounded
//! connection pool, an [`Executor`](repro_core::Executor) running statements
//! on it, the parent/child INSERT generators, and the schema setup that
//! creates the foreign key with `ON DELETE CASCADE`. Works against any
//! PostgreSQL-wire database (the default connection string points at a local
//! CockroachDB node).

pub mod args;
pub mod error;
pub mod executor;
pub mod pool;
pub mod setup;
pub mod sql;

pub use args::{ReproArgs, CHILD_BATCH, DEFAULT_CONNECTION_STRING, PARENT_BATCH};
pub use error::PostgreSQLReproError;
pub use executor::PostgreSQLExecutor;
pub use pool::ConnectionPool;
pub use setup::{row_count, setup_schema};
pub use sql::{ChildInsert, ParentInsert};
