//! SQLite adapter for the driftless migration engine.
//!
//! This crate binds a single `tokio-rusqlite` connection to the engine's
//! [`SqlExecutor`](driftless_migrate::SqlExecutor) capability.
//!
//! # Features
//!
//! - Async/await support via `tokio-rusqlite`
//! - Transactional DDL with `BEGIN IMMEDIATE`
//! - In-memory and file-based databases
//! - File-backed databases report their path for pre-migration backups
//!
//! # Example
//!
//! ```rust,ignore
//! use driftless_migrate::{MigrationEngine, MigrationPolicy};
//! use driftless_sqlite::SqliteExecutor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = SqliteExecutor::connect("sqlite://./app.db").await?;
//!     let report = MigrationEngine::new(MigrationPolicy::default())
//!         .run(&conn, &model())
//!         .await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig};
pub use connection::SqliteExecutor;
pub use error::{SqliteError, SqliteResult};
