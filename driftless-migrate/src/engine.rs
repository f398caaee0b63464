//! Migration engine implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use driftless_model::{Dialect, validate_entities};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backup::backup_database;
use crate::capability::ServerVersion;
use crate::catalog::{CatalogFilter, reader_for};
use crate::compat::oracle_for;
use crate::connection::SqlExecutor;
use crate::diff::{SchemaDiffer, SchemaDifference};
use crate::error::{MigrateResult, MigrationError};
use crate::executor::{ExecutionState, ScriptExecutor, ScriptSink, StdoutSink};
use crate::history::HistoryRecorder;
use crate::lock::{LockProvider, ProcessLock};
use crate::policy::MigrationPolicy;
use crate::script::MigrationScript;
use crate::source::ModelSource;
use crate::sql::{GeneratorOptions, generator_for};

/// What a run would do, computed without changing anything.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Resolved dialect.
    pub dialect: Dialect,
    /// Detected server version.
    pub version: Option<ServerVersion>,
    /// Structural difference.
    pub difference: SchemaDifference,
    /// Rendered scripts, in execution order.
    pub scripts: Vec<MigrationScript>,
}

impl MigrationPlan {
    /// Check if there's anything to migrate.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Get a summary of the plan.
    pub fn summary(&self) -> String {
        self.difference.summary()
    }
}

/// Result of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// Resolved dialect.
    pub dialect: Dialect,
    /// Scripts emitted or applied.
    pub scripts: Vec<MigrationScript>,
    /// Final executor state.
    pub state: ExecutionState,
    /// Whether scripts were only emitted.
    pub dry_run: bool,
    /// Whether history rows were written.
    pub history_recorded: bool,
    /// Swallowed failure, when errors are not propagated.
    pub failure: Option<String>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl MigrationReport {
    /// Whether the run ended without a failure.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of scripts applied to the database.
    pub fn applied_count(&self) -> usize {
        if self.state == ExecutionState::Committed {
            self.scripts.len()
        } else {
            0
        }
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        if let Some(failure) = &self.failure {
            return format!("Migration failed and was rolled back: {}", failure);
        }
        if self.scripts.is_empty() {
            return "Schema is up to date".to_string();
        }
        if self.dry_run {
            return format!("[DRY RUN] {} scripts generated", self.scripts.len());
        }
        format!("{} scripts applied in {}ms", self.applied_count(), self.duration_ms)
    }
}

/// The main migration engine.
///
/// One [`run`](Self::run) reconciles a database with the declared model:
/// lock, introspect, diff, generate, then apply or emit, then record.
pub struct MigrationEngine {
    policy: MigrationPolicy,
    lock: Arc<dyn LockProvider>,
    sink: Arc<dyn ScriptSink>,
    cancel: CancellationToken,
}

impl MigrationEngine {
    /// Create a new migration engine. Runs are serialized by the process-wide
    /// lock and dry runs print to stdout.
    pub fn new(policy: MigrationPolicy) -> Self {
        Self {
            policy,
            lock: Arc::new(ProcessLock::global()),
            sink: Arc::new(StdoutSink),
            cancel: CancellationToken::new(),
        }
    }

    /// Use a different lock provider.
    pub fn with_lock(mut self, lock: impl LockProvider + 'static) -> Self {
        self.lock = Arc::new(lock);
        self
    }

    /// Send dry-run scripts to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ScriptSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Abort the in-flight run when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Get the policy.
    pub fn policy(&self) -> &MigrationPolicy {
        &self.policy
    }

    /// Resolve the dialect from the policy override or the provider identity.
    pub fn resolve_dialect(&self, conn: &dyn SqlExecutor) -> MigrateResult<Dialect> {
        if let Some(dialect) = self.policy.dialect {
            return Ok(dialect);
        }
        Dialect::from_provider(conn.provider()).ok_or_else(|| {
            MigrationError::configuration(format!(
                "cannot determine SQL dialect for provider '{}'",
                conn.provider()
            ))
        })
    }

    /// Compute the plan without taking the lock or changing anything.
    pub async fn plan(
        &self,
        conn: &dyn SqlExecutor,
        model: &dyn ModelSource,
    ) -> MigrateResult<MigrationPlan> {
        let dialect = self.resolve_dialect(conn)?;
        self.plan_for(conn, model, dialect).await
    }

    async fn plan_for(
        &self,
        conn: &dyn SqlExecutor,
        model: &dyn ModelSource,
        dialect: Dialect,
    ) -> MigrateResult<MigrationPlan> {
        let entities = model.declared_entities()?;
        validate_entities(&entities)?;

        let reader = reader_for(dialect);
        let filter = CatalogFilter::new(self.policy.history_table());
        let tables = reader.read_catalog(conn, &filter).await?;
        let version = reader.server_version(conn).await?;
        debug!(
            dialect = %dialect,
            tables = tables.len(),
            version = ?version.map(|v| v.to_string()),
            "Read catalog"
        );

        let oracle = oracle_for(dialect);
        let difference = SchemaDiffer::new(oracle.as_ref())
            .with_policy(&self.policy)
            .diff(&entities, &tables);

        let generator = generator_for(dialect, GeneratorOptions::from_policy(&self.policy, version));
        let scripts = generator.generate(&difference)?;

        Ok(MigrationPlan {
            dialect,
            version,
            difference,
            scripts,
        })
    }

    /// Reconcile the database with the declared model.
    pub async fn run(
        &self,
        conn: &dyn SqlExecutor,
        model: &dyn ModelSource,
    ) -> MigrateResult<MigrationReport> {
        let start = Instant::now();
        let dialect = self.resolve_dialect(conn)?;

        let lock = self.lock.acquire(conn, dialect).await?;
        let result = self.run_locked(conn, model, dialect, start).await;
        if let Err(e) = lock.release(conn).await {
            warn!(error = %e, "Failed to release migration lock");
        }

        result
    }

    async fn run_locked(
        &self,
        conn: &dyn SqlExecutor,
        model: &dyn ModelSource,
        dialect: Dialect,
        start: Instant,
    ) -> MigrateResult<MigrationReport> {
        if self.policy.validate_connection {
            conn.ping()
                .await
                .map_err(|e| MigrationError::database(format!("connection check failed: {}", e)))?;
        }

        let plan = self.plan_for(conn, model, dialect).await?;
        let mut report = MigrationReport {
            dialect,
            scripts: plan.scripts,
            state: ExecutionState::Idle,
            dry_run: self.policy.script_only,
            history_recorded: false,
            failure: None,
            duration_ms: 0,
        };

        if report.scripts.is_empty() {
            info!(dialect = %dialect, "Schema is up to date");
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        let mut executor = ScriptExecutor::new(conn)
            .with_timeout(self.policy.command_timeout_ms.map(Duration::from_millis))
            .with_cancellation(self.cancel.clone());

        if self.policy.script_only {
            executor.emit(&report.scripts, self.sink.as_ref())?;
            info!(scripts = report.scripts.len(), "[DRY RUN] {}", plan.difference.summary());
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        if self.policy.backup_database && plan.difference.is_destructive() {
            if let Err(e) = backup_database(conn, self.policy.backup_dir.as_deref()).await {
                warn!(error = %e, "Backup failed, continuing");
            }
        }

        let applied = executor.apply(&report.scripts).await;
        report.state = executor.state();

        if let Err(e) = applied {
            if self.policy.throw_on_error || e.is_fatal() {
                return Err(e);
            }
            if self.policy.detailed_errors {
                error!(error = ?e, "Migration failed");
            } else {
                error!(error = %e, "Migration failed");
            }
            report.failure = Some(e.to_string());
            report.duration_ms = elapsed_ms(start);
            return Ok(report);
        }

        info!(
            dialect = %dialect,
            scripts = report.scripts.len(),
            "Applied migration: {}",
            plan.difference.summary()
        );

        if self.policy.track_history {
            let recorder = HistoryRecorder::new(conn, dialect, self.policy.history_table());
            match recorder.record(&report.scripts).await {
                Ok(_) => report.history_recorded = true,
                Err(e) => warn!(error = %e, "Failed to record migration history"),
            }
        }

        report.duration_ms = elapsed_ms(start);
        Ok(report)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
