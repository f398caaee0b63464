//! # driftless-model
//!
//! Metadata model for the driftless auto-migration engine.
//!
//! This crate provides:
//! - Declared entities and properties, as handed over by a model introspector
//! - Live tables and columns, as read from a database catalog
//! - The four supported SQL dialects and their identifier quoting
//! - Per-dialect type tables resolving a logical [`ValueKind`] to a column type
//! - Validation of declared entities
//!
//! ## Example
//!
//! ```rust
//! use driftless_model::{Dialect, EntityDefinition, PropertyDefinition, ValueKind};
//!
//! let order = EntityDefinition::new("Order")
//!     .property(PropertyDefinition::new("Id", ValueKind::Int32).primary_key().identity())
//!     .property(PropertyDefinition::new("Total", ValueKind::Decimal).precision(10, 2))
//!     .property(PropertyDefinition::new("Status", ValueKind::String).max_length(20).required());
//!
//! let status = order.find_property("status").unwrap();
//! assert_eq!(status.resolve_sql_type(Dialect::MySql), "VARCHAR(20)");
//! ```

pub mod dialect;
pub mod entity;
pub mod error;
pub mod ident;
pub mod table;
pub mod types;
pub mod validator;

pub use dialect::Dialect;
pub use entity::{EntityDefinition, PropertyDefinition};
pub use error::{ModelError, ModelResult};
pub use ident::same_ident;
pub use table::{ColumnDefinition, TableDefinition};
pub use types::{DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE, ValueKind};
pub use validator::{Validator, validate_entities};
