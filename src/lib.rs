//! # driftless
//!
//! Schema-follows-code auto-migration for SQLite, MySQL, PostgreSQL and
//! SQL Server.
//!
//! driftless provides:
//! - A metadata model for declared entities and live tables
//! - Catalog introspection and widening-only type comparison per dialect
//! - DDL generation that never narrows a column or drops data unless asked
//! - Transactional apply with rollback, or dry-run script output
//! - A history table recording every applied script
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use driftless::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = vec![
//!         EntityDefinition::new("Order")
//!             .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key().identity())
//!             .property(PropertyDefinition::new("Total", ValueKind::Decimal).precision(10, 2))
//!             .property(PropertyDefinition::new("Status", ValueKind::String).max_length(20).required()),
//!     ];
//!
//!     let conn = SqliteExecutor::connect("sqlite://./shop.db").await?;
//!     let report = MigrationEngine::new(MigrationPolicy::from_file("driftless.toml")?)
//!         .run(&conn, &model)
//!         .await?;
//!
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Declared entities, live tables and dialects.
pub mod model {
    pub use driftless_model::*;
}

/// The migration engine and its strategy traits.
pub mod migrate {
    pub use driftless_migrate::*;
}

/// SQLite adapter.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use driftless_sqlite::*;
}

/// PostgreSQL adapter.
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use driftless_postgres::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        MigrateResult, MigrationEngine, MigrationError, MigrationPlan, MigrationPolicy,
        MigrationReport, MigrationScript, ModelSource, SqlExecutor,
    };
    pub use crate::model::{Dialect, EntityDefinition, PropertyDefinition, ValueKind};

    #[cfg(feature = "postgres")]
    pub use crate::postgres::{PgExecutor, PgPool};
    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::SqliteExecutor;
}

// Re-export key types at the crate root
pub use migrate::{MigrationEngine, MigrationError, MigrationPolicy, MigrationReport};
pub use model::{Dialect, EntityDefinition, PropertyDefinition, ValueKind};
