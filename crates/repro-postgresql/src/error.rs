//! Error types for the PostgreSQL collaborators.

use thiserror::Error;

/// Errors that abort a run before (or instead of) launching workers.
#[derive(Error, Debug)]
pub enum PostgreSQLReproError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Schema setup statement failed.
    #[error("Schema setup failed on '{statement}': {source}")]
    Setup {
        statement: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),
}
