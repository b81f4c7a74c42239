//! # tablegate
//!
//! Schema-driven table access for Microsoft SQL Server.
//!
//! This library provides generic, table-agnostic data access over a
//! configured database with support for:
//!
//! - **Live introspection** of tables, columns, keys, and foreign keys
//! - **Paginated reads** with OFFSET/FETCH and a windowed fallback
//! - **Type-aware writes** that coerce form-shaped values to column types
//! - **Bracket-quoted identifiers** validated against the live schema
//!
//! ## Example
//!
//! ```rust,no_run
//! use tablegate::{Config, PageRequest, TableGateway};
//!
//! #[tokio::main]
//! async fn main() -> tablegate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let gateway = TableGateway::new(config);
//!     let request = PageRequest::new(Some(1), Some(25), 50)?;
//!     let page = gateway.get_table_data("Orders", &request).await;
//!     println!("{} of {} rows", page.data.len(), page.total);
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod config;
pub mod connect;
pub mod core;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod introspect;
pub mod query;

// Re-exports for convenient access
pub use binding::{coerce_value, BindingType, ParamBinding};
pub use config::{Config, ConnectionConfig, GatewayOptions};
pub use crate::core::{ColumnMetadata, ForeignKeyMetadata, Record, TableMetadata, Value};
pub use error::{GatewayError, Result};
pub use gateway::{TableData, TableGateway};
pub use query::{OrderDirection, PageRequest};
