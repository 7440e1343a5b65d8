//! Fixed-size connection pool.
//!
//! Every statement checks out one connection for its duration, so the number
//! of statements in flight across all workers never exceeds the pool size.

use crate::error::PostgreSQLReproError;
use std::ops::Deref;
use std::sync::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, warn};

/// A fixed set of connections handed out one statement at a time.
pub struct ConnectionPool {
    connection_string: String,
    idle: Mutex<Vec<Client>>,
    permits: Semaphore,
    size: usize,
}

impl ConnectionPool {
    /// Open `max_connections` connections up front.
    ///
    /// Fails if any connection cannot be established; no retry happens here,
    /// a run that cannot connect is aborted before any worker starts.
    pub async fn connect(
        connection_string: &str,
        max_connections: usize,
    ) -> Result<Self, PostgreSQLReproError> {
        if max_connections == 0 {
            return Err(PostgreSQLReproError::Config(
                "max connections must be at least 1".to_string(),
            ));
        }

        let mut clients = Vec::with_capacity(max_connections);
        for _ in 0..max_connections {
            clients.push(open(connection_string).await?);
        }

        // Test connection
        clients[0].simple_query("SELECT 1").await?;
        debug!("Opened {} connections", max_connections);

        Ok(Self {
            connection_string: connection_string.to_string(),
            idle: Mutex::new(clients),
            permits: Semaphore::new(max_connections),
            size: max_connections,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for a free connection. A connection found closed is reopened.
    pub async fn acquire(&self) -> Result<PooledClient<'_>, PostgreSQLReproError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PostgreSQLReproError::Connection(e.to_string()))?;

        let client = self
            .idle
            .lock()
            .map_err(|e| PostgreSQLReproError::Connection(e.to_string()))?
            .pop();
        let client = match client {
            Some(client) if !client.is_closed() => client,
            _ => {
                warn!("Pooled connection closed, reconnecting");
                open(&self.connection_string).await?
            }
        };

        Ok(PooledClient {
            pool: self,
            client: Some(client),
            _permit: permit,
        })
    }
}

async fn open(connection_string: &str) -> Result<Client, PostgreSQLReproError> {
    let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("PostgreSQL connection error: {}", e);
        }
    });

    Ok(client)
}

/// A checked-out connection, returned to the pool on drop.
pub struct PooledClient<'a> {
    pool: &'a ConnectionPool,
    client: Option<Client>,
    _permit: SemaphorePermit<'a>,
}

impl Deref for PooledClient<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        // Only taken in `drop`.
        self.client.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledClient<'_> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(client);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_connections_rejected() {
        let result = ConnectionPool::connect("postgresql://root@127.0.0.1:1/none", 0).await;
        assert!(matches!(result, Err(PostgreSQLReproError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        let result = ConnectionPool::connect(
            "postgresql://root@127.0.0.1:1/none?connect_timeout=1",
            2,
        )
        .await;
        assert!(matches!(result, Err(PostgreSQLReproError::PostgreSQL(_))));
    }
}
