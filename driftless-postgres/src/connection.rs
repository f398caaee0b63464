//! PostgreSQL connection wrapper.

use async_trait::async_trait;
use deadpool_postgres::Object;
use driftless_migrate::{MigrateResult, Row, SqlExecutor, SqlParam};
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::error::PgResult;
use crate::types::{params_to_sql, row_from_pg};

/// One pooled PostgreSQL connection exposed as a [`SqlExecutor`].
///
/// PostgreSQL runs DDL inside transactions, so the whole migration commits
/// or rolls back as a unit.
pub struct PgExecutor {
    client: Object,
    identity: String,
}

impl PgExecutor {
    /// Wrap a pooled client.
    pub(crate) fn new(client: Object, identity: String) -> Self {
        Self { client, identity }
    }

    /// Execute a batch of statements in a single round-trip.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        debug!(sql = %sql, "Executing batch");
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn execute_params(&self, sql: &str, params: &[SqlParam]) -> PgResult<u64> {
        if params.is_empty() {
            self.batch_execute(sql).await?;
            return Ok(0);
        }

        debug!(sql = %sql, params = params.len(), "Executing statement");
        let boxed = params_to_sql(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        Ok(self.client.execute(sql, &refs).await?)
    }

    async fn query_params(&self, sql: &str, params: &[SqlParam]) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), "Executing query");
        let boxed = params_to_sql(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = self.client.query(sql, &refs).await?;
        Ok(rows.iter().map(row_from_pg).collect())
    }

    /// Get the underlying pooled client.
    pub fn inner(&self) -> &Object {
        &self.client
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    fn provider(&self) -> &str {
        "postgresql"
    }

    fn database_identity(&self) -> String {
        self.identity.clone()
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<u64> {
        Ok(self.execute_params(sql, params).await?)
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> MigrateResult<Vec<Row>> {
        Ok(self.query_params(sql, params).await?)
    }

    async fn begin(&self) -> MigrateResult<()> {
        Ok(self.batch_execute("BEGIN").await?)
    }

    async fn commit(&self) -> MigrateResult<()> {
        Ok(self.batch_execute("COMMIT").await?)
    }

    async fn rollback(&self) -> MigrateResult<()> {
        Ok(self.batch_execute("ROLLBACK").await?)
    }
}
