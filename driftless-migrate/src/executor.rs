//! Script execution.
//!
//! Scripts are either emitted to a [`ScriptSink`] (dry run) or applied inside
//! a single transaction. A failing statement, a cancelled token or an expired
//! deadline rolls the whole transaction back.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::connection::SqlExecutor;
use crate::error::{MigrateResult, MigrationError};
use crate::script::MigrationScript;

/// Where an executor is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Nothing sent yet. Terminal for dry runs and empty runs.
    Idle,
    /// Transaction begun, no script run yet.
    TransactionOpen,
    /// Running scripts.
    Applying,
    /// All scripts committed.
    Committed,
    /// Transaction rolled back after a failure.
    RolledBack,
}

impl ExecutionState {
    /// Whether the state is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle | Self::Committed | Self::RolledBack)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TransactionOpen => "transaction open",
            Self::Applying => "applying",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Output for dry-run scripts.
pub trait ScriptSink: Send + Sync {
    /// Emit one script.
    fn emit(&self, script: &MigrationScript) -> MigrateResult<()>;
}

/// Writes scripts to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl ScriptSink for StdoutSink {
    fn emit(&self, script: &MigrationScript) -> MigrateResult<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}\n", script)?;
        Ok(())
    }
}

/// Collects scripts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    scripts: Mutex<Vec<MigrationScript>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts emitted so far.
    pub fn scripts(&self) -> Vec<MigrationScript> {
        self.scripts.lock().clone()
    }

    /// Emitted scripts rendered as one SQL document.
    pub fn contents(&self) -> String {
        crate::script::render_scripts(&self.scripts.lock())
    }
}

impl ScriptSink for MemorySink {
    fn emit(&self, script: &MigrationScript) -> MigrateResult<()> {
        self.scripts.lock().push(script.clone());
        Ok(())
    }
}

/// Applies scripts against one connection.
pub struct ScriptExecutor<'a> {
    conn: &'a dyn SqlExecutor,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    state: ExecutionState,
}

impl<'a> ScriptExecutor<'a> {
    /// Create an executor over a connection.
    pub fn new(conn: &'a dyn SqlExecutor) -> Self {
        Self {
            conn,
            timeout: None,
            cancel: CancellationToken::new(),
            state: ExecutionState::Idle,
        }
    }

    /// Bound each statement by a deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Abort when the token is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Current state.
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Emit scripts to a sink without touching the database.
    pub fn emit(&self, scripts: &[MigrationScript], sink: &dyn ScriptSink) -> MigrateResult<()> {
        for script in scripts {
            debug!(table = %script.table_name, operation = %script.operation, "Emitting script");
            sink.emit(script)?;
        }
        Ok(())
    }

    /// Apply scripts in order inside one transaction.
    pub async fn apply(&mut self, scripts: &[MigrationScript]) -> MigrateResult<()> {
        if scripts.is_empty() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(MigrationError::Cancelled);
        }

        self.conn.begin().await?;
        self.transition(ExecutionState::TransactionOpen);

        for script in scripts {
            self.transition(ExecutionState::Applying);
            for statement in script.statements() {
                if let Err(e) = self.run_statement(statement).await {
                    self.rollback().await;
                    return Err(match e {
                        MigrationError::Cancelled | MigrationError::Timeout { .. } => e,
                        other => MigrationError::execution(&script.description, statement, other),
                    });
                }
            }
            info!(
                table = %script.table_name,
                operation = %script.operation,
                "{}",
                script.description
            );
        }

        if let Err(e) = self.conn.commit().await {
            self.rollback().await;
            return Err(MigrationError::execution("Commit migration", "COMMIT", e));
        }
        self.transition(ExecutionState::Committed);
        Ok(())
    }

    async fn run_statement(&self, sql: &str) -> MigrateResult<()> {
        debug!(sql = %sql, "Executing statement");
        let run = async {
            match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, self.conn.execute(sql, &[]))
                    .await
                    .map_err(|_| MigrationError::Timeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })?,
                None => self.conn.execute(sql, &[]).await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MigrationError::Cancelled),
            result = run => result.map(|_| ()),
        }
    }

    async fn rollback(&mut self) {
        if let Err(e) = self.conn.rollback().await {
            error!(error = %e, "Rollback failed");
        }
        self.transition(ExecutionState::RolledBack);
    }

    fn transition(&mut self, next: ExecutionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Execution state");
            self.state = next;
        }
    }
}
