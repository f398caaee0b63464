//! Connection pool for PostgreSQL.

use std::sync::Arc;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::PgConfig;
use crate::connection::PgExecutor;
use crate::error::{PgError, PgResult};

/// A connection pool for PostgreSQL.
///
/// Each migration run checks out one connection with [`PgPool::executor`]
/// and keeps it until the run ends, so its transaction and session-level
/// advisory lock stay on the same backend.
#[derive(Clone)]
pub struct PgPool {
    inner: Pool,
    config: Arc<PgConfig>,
}

impl PgPool {
    /// Create a new connection pool from configuration.
    pub fn new(config: PgConfig) -> PgResult<Self> {
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(config.to_pg_config(), NoTls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(config.max_connections)
            .build()
            .map_err(|e| PgError::config(format!("failed to create pool: {}", e)))?;

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            max_connections = %config.max_connections,
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            inner: pool,
            config: Arc::new(config),
        })
    }

    /// Create a pool from a database URL.
    pub fn from_url(url: &str) -> PgResult<Self> {
        Self::new(PgConfig::from_url(url)?)
    }

    /// Check out a connection for a migration run.
    pub async fn executor(&self) -> PgResult<PgExecutor> {
        debug!("Acquiring connection from pool");
        let client = self.inner.get().await?;
        Ok(PgExecutor::new(client, self.config.identity()))
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Close the pool and all connections.
    pub fn close(&self) {
        self.inner.close();
        info!("PostgreSQL connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_from_url() {
        let pool = PgPool::from_url("postgresql://localhost/shop?max_connections=2").unwrap();
        assert_eq!(pool.config().max_connections, 2);
        assert_eq!(pool.config().database, "shop");
    }

    #[test]
    fn test_pool_rejects_bad_url() {
        assert!(PgPool::from_url("sqlite://app.db").is_err());
    }
}
