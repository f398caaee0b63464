//! # driftless-migrate
//!
//! Auto-migration engine for driftless.
//!
//! This crate provides functionality for:
//! - Reading the live schema from SQLite, MySQL, PostgreSQL and SQL Server catalogs
//! - Widening-only type compatibility checks per dialect
//! - Schema diffing between declared entities and live tables
//! - DDL generation per dialect, with capability checks
//! - Transactional apply with rollback, or dry-run script output
//! - Migration history tracking in the database
//!
//! ## Architecture
//!
//! The engine recomputes the difference between the declared model and the
//! database on every run. There is no sequence of named migrations to replay.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Model Source │────▶│ Schema Differ  │◀────│ Catalog     │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!                              │
//!                              ▼
//!                      ┌────────────────┐     ┌─────────────┐
//!                      │ DDL Generator  │────▶│ Executor    │
//!                      └────────────────┘     └─────────────┘
//!                                                    │
//!                                                    ▼
//!                                            ┌─────────────┐
//!                                            │ History Tbl │
//!                                            └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use driftless_migrate::{MigrationEngine, MigrationPolicy};
//! use driftless_model::{EntityDefinition, PropertyDefinition, ValueKind};
//!
//! async fn sync(conn: &dyn driftless_migrate::SqlExecutor) -> driftless_migrate::MigrateResult<()> {
//!     let model = vec![
//!         EntityDefinition::new("Order")
//!             .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key().identity())
//!             .property(PropertyDefinition::new("Status", ValueKind::String).max_length(20).required()),
//!     ];
//!
//!     let policy = MigrationPolicy::from_file("driftless.toml")?;
//!     let report = MigrationEngine::new(policy).run(conn, &model).await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Policies load from the `[migrations]` table of a TOML file, with
//! `${VAR}` environment interpolation:
//!
//! ```toml
//! [migrations]
//! allow_drop_column = true
//! script_only = false
//! history_table_name = "_driftless_history"
//! backup_dir = "${DATA_DIR}/backups"
//! ```

pub mod backup;
pub mod capability;
pub mod catalog;
pub mod compat;
pub mod connection;
pub mod diff;
pub mod engine;
pub mod error;
pub mod executor;
pub mod history;
pub mod lock;
pub mod policy;
pub mod script;
pub mod source;
pub mod sql;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use backup::{backup_database, backup_path};
pub use capability::{Capability, ServerVersion, capability};
pub use catalog::{CatalogFilter, CatalogReader, reader_for};
pub use compat::{SqlType, TypeFamily, TypeOracle, oracle_for};
pub use connection::{Row, SqlExecutor, SqlParam};
pub use diff::{SchemaDiffer, SchemaDifference, TableChange};
pub use engine::{MigrationEngine, MigrationPlan, MigrationReport};
pub use error::{MigrateResult, MigrationError};
pub use executor::{ExecutionState, MemorySink, ScriptExecutor, ScriptSink, StdoutSink};
pub use history::{HistoryRecord, HistoryRecorder};
pub use lock::{AdvisoryLock, LockProvider, NoopLock, ProcessLock, RunLock};
pub use policy::{DEFAULT_HISTORY_TABLE, MigrationPolicy};
pub use script::{MigrationScript, Operation, render_scripts};
pub use source::ModelSource;
pub use sql::{DdlGenerator, GeneratorOptions, generator_for};
