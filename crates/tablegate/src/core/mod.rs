//! Core types shared across the gateway.
//!
//! - [`schema`]: table, column, and foreign-key metadata
//! - [`value`]: tagged scalar values and ordered row records
//! - [`identifier`]: identifier validation and bracket quoting

pub mod identifier;
pub mod schema;
pub mod value;

pub use schema::{ColumnMetadata, ForeignKeyMetadata, TableMetadata};
pub use value::{Record, Value};
