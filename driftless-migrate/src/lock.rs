//! Run serialization.
//!
//! Only one migration run may proceed against a database at a time. A
//! [`LockProvider`] hands out a [`RunLock`] guarding the whole
//! diff-generate-execute-record sequence; concurrent callers wait for it.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use driftless_model::Dialect;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::connection::SqlExecutor;
use crate::error::{MigrateResult, MigrationError};

static GLOBAL_LOCK: LazyLock<Arc<Mutex<()>>> = LazyLock::new(|| Arc::new(Mutex::new(())));

/// Exclusive right to run migrations.
///
/// In-process state is released on drop. A database-side lock is released
/// by [`RunLock::release`], or by the server when the session ends.
pub struct RunLock {
    key: String,
    unlock_sql: Option<String>,
    release_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl RunLock {
    /// Create a lock with nothing to release.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            unlock_sql: None,
            release_fn: None,
        }
    }

    /// Run `release` when the lock is dropped.
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release_fn = Some(Box::new(release));
        self
    }

    /// Statement that releases the database-side lock.
    pub fn with_unlock_sql(mut self, sql: impl Into<String>) -> Self {
        self.unlock_sql = Some(sql.into());
        self
    }

    /// Lock key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock.
    pub async fn release(mut self, conn: &dyn SqlExecutor) -> MigrateResult<()> {
        if let Some(sql) = self.unlock_sql.take() {
            conn.execute(&sql, &[])
                .await
                .map_err(|e| MigrationError::lock_failed(format!("release {}: {}", self.key, e)))?;
        }
        debug!(key = %self.key, "Released migration lock");
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(release) = self.release_fn.take() {
            release();
        }
    }
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock")
            .field("key", &self.key)
            .field("unlock_sql", &self.unlock_sql)
            .finish()
    }
}

/// Hands out run locks.
#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Wait for and take the lock for the connection's database.
    async fn acquire(&self, conn: &dyn SqlExecutor, dialect: Dialect) -> MigrateResult<RunLock>;
}

/// No serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLock;

#[async_trait]
impl LockProvider for NoopLock {
    async fn acquire(&self, _conn: &dyn SqlExecutor, _dialect: Dialect) -> MigrateResult<RunLock> {
        Ok(RunLock::new("noop"))
    }
}

/// In-process mutex. Serializes runs within one process.
#[derive(Debug, Clone)]
pub struct ProcessLock {
    mutex: Arc<Mutex<()>>,
}

impl ProcessLock {
    /// A lock private to this instance and its clones.
    pub fn new() -> Self {
        Self {
            mutex: Arc::new(Mutex::new(())),
        }
    }

    /// The lock shared by the whole process.
    pub fn global() -> Self {
        Self {
            mutex: Arc::clone(&GLOBAL_LOCK),
        }
    }

    async fn lock(&self) -> RunLock {
        let guard = Arc::clone(&self.mutex).lock_owned().await;
        debug!("Acquired process migration lock");
        RunLock::new("process").on_release(move || drop(guard))
    }
}

impl Default for ProcessLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockProvider for ProcessLock {
    async fn acquire(&self, _conn: &dyn SqlExecutor, _dialect: Dialect) -> MigrateResult<RunLock> {
        Ok(self.lock().await)
    }
}

/// Database advisory lock keyed by the database identity. Serializes runs
/// across processes.
#[derive(Debug, Clone)]
pub struct AdvisoryLock {
    fallback: ProcessLock,
}

impl AdvisoryLock {
    /// Create an advisory lock provider.
    pub fn new() -> Self {
        Self {
            fallback: ProcessLock::global(),
        }
    }

    /// Numeric key for `pg_advisory_lock`.
    pub fn numeric_key(identity: &str) -> i64 {
        let digest = Sha256::digest(identity.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        i64::from_be_bytes(bytes)
    }

    /// Named key for `GET_LOCK` and `sp_getapplock`.
    pub fn named_key(identity: &str) -> String {
        let digest = Sha256::digest(identity.as_bytes());
        format!("driftless_{}", hex::encode(&digest[..16]))
    }
}

impl Default for AdvisoryLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockProvider for AdvisoryLock {
    async fn acquire(&self, conn: &dyn SqlExecutor, dialect: Dialect) -> MigrateResult<RunLock> {
        let identity = conn.database_identity();
        let failed = |e: MigrationError| MigrationError::lock_failed(e.to_string());

        let lock = match dialect {
            // The database file lock already serializes writers.
            Dialect::Sqlite => return Ok(self.fallback.lock().await),
            Dialect::PostgreSql => {
                let key = Self::numeric_key(&identity);
                conn.query(&format!("SELECT pg_advisory_lock({})", key), &[])
                    .await
                    .map_err(failed)?;
                RunLock::new(key.to_string())
                    .with_unlock_sql(format!("SELECT pg_advisory_unlock({})", key))
            }
            Dialect::MySql => {
                let name = Self::named_key(&identity);
                let literal = dialect.string_literal(&name);
                let rows = conn
                    .query(&format!("SELECT GET_LOCK({}, -1) AS acquired", literal), &[])
                    .await
                    .map_err(failed)?;
                if rows.first().and_then(|r| r.get_i64("acquired")) != Some(1) {
                    return Err(MigrationError::lock_failed(format!("GET_LOCK({}) refused", name)));
                }
                RunLock::new(name).with_unlock_sql(format!("SELECT RELEASE_LOCK({})", literal))
            }
            Dialect::SqlServer => {
                let name = Self::named_key(&identity);
                let literal = dialect.string_literal(&name);
                let rows = conn
                    .query(
                        &format!(
                            "DECLARE @result int;\n\
                             EXEC @result = sp_getapplock @Resource = {}, @LockMode = 'Exclusive', \
                             @LockOwner = 'Session', @LockTimeout = -1;\n\
                             SELECT @result AS acquired",
                            literal
                        ),
                        &[],
                    )
                    .await
                    .map_err(failed)?;
                match rows.first().and_then(|r| r.get_i64("acquired")) {
                    Some(code) if code >= 0 => {}
                    code => {
                        return Err(MigrationError::lock_failed(format!(
                            "sp_getapplock({}) returned {:?}",
                            name, code
                        )));
                    }
                }
                RunLock::new(name).with_unlock_sql(format!(
                    "EXEC sp_releaseapplock @Resource = {}, @LockOwner = 'Session'",
                    literal
                ))
            }
        };

        debug!(key = %lock.key(), dialect = %dialect, "Acquired advisory migration lock");
        Ok(lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Row;
    use crate::testing::RecordingExecutor;
    use std::time::Duration;

    #[tokio::test]
    async fn test_process_lock_serializes() {
        let lock = ProcessLock::new();
        let conn = RecordingExecutor::new("sqlite");

        let held = lock.acquire(&conn, Dialect::Sqlite).await.unwrap();
        let second = lock.clone();
        let waiter = tokio::spawn(async move {
            let conn = RecordingExecutor::new("sqlite");
            second.acquire(&conn, Dialect::Sqlite).await.map(|l| l.key().to_string())
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap().unwrap(), "process");
    }

    #[tokio::test]
    async fn test_postgres_advisory_lock() {
        let conn = RecordingExecutor::new("postgres").with_identity("postgres://db.local/app");
        let lock = AdvisoryLock::new().acquire(&conn, Dialect::PostgreSql).await.unwrap();
        let key = AdvisoryLock::numeric_key("postgres://db.local/app");

        assert_eq!(lock.key(), key.to_string());
        lock.release(&conn).await.unwrap();
        assert_eq!(conn.statements(), vec![format!("SELECT pg_advisory_unlock({})", key)]);
    }

    #[tokio::test]
    async fn test_mysql_lock_refused() {
        let conn = RecordingExecutor::new("mysql")
            .respond("GET_LOCK", vec![Row::new().with("acquired", 0)]);
        let err = AdvisoryLock::new().acquire(&conn, Dialect::MySql).await.unwrap_err();
        assert!(matches!(err, MigrationError::LockFailed(_)));
    }

    #[tokio::test]
    async fn test_mssql_applock() {
        let conn = RecordingExecutor::new("sqlserver")
            .respond("sp_getapplock", vec![Row::new().with("acquired", 0)]);
        let lock = AdvisoryLock::new().acquire(&conn, Dialect::SqlServer).await.unwrap();
        assert!(lock.key().starts_with("driftless_"));
        lock.release(&conn).await.unwrap();
        assert!(conn.statements()[0].starts_with("EXEC sp_releaseapplock @Resource = N'driftless_"));
    }

    #[test]
    fn test_keys_are_stable() {
        assert_eq!(
            AdvisoryLock::numeric_key("a"),
            AdvisoryLock::numeric_key("a")
        );
        assert_ne!(AdvisoryLock::named_key("a"), AdvisoryLock::named_key("b"));
        assert_eq!(AdvisoryLock::named_key("a").len(), "driftless_".len() + 32);
    }
}
