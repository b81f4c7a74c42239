//! Schema metadata types for tables, columns, and foreign keys.
//!
//! Metadata is discovered fresh on every call (no cache); these types are
//! the database-agnostic representation handed to query construction.

use serde::Serialize;

use crate::error::{GatewayError, Result};

/// Column metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMetadata {
    /// Column name (unique within a table).
    pub name: String,

    /// Normalized lowercase data type (e.g. "int", "nvarchar", "datetime2").
    pub data_type: String,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Maximum length for string/binary types (-1 for max/unbounded).
    pub max_length: Option<i32>,

    /// Numeric precision.
    pub precision: Option<i32>,

    /// Numeric scale.
    pub scale: Option<i32>,

    /// Whether the engine generates the value on insert. Identity columns
    /// must never be written by the caller.
    pub is_identity: bool,
}

/// Foreign key metadata: a directed edge
/// `table.column -> referenced_table.referenced_column`.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyMetadata {
    /// Constraint name.
    pub name: String,

    /// Local column name.
    pub column: String,

    /// Referenced table name.
    pub referenced_table: String,

    /// Referenced column name.
    pub referenced_column: String,
}

/// Table metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TableMetadata {
    /// Table name.
    pub name: String,

    /// Column definitions in the engine's physical ordinal order.
    pub columns: Vec<ColumnMetadata>,

    /// Primary key column names.
    pub primary_key: Vec<String>,

    /// Foreign key constraints, one entry per column pair.
    pub foreign_keys: Vec<ForeignKeyMetadata>,
}

impl TableMetadata {
    /// Create empty metadata for a table name. Returned for unknown tables
    /// so schema enumeration surfaces as "no data" rather than a failure.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        TableMetadata {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// True when introspection found no columns, i.e. the table does not
    /// exist in the target schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column by name (ASCII case-insensitive, matching the
    /// engine's identifier comparison).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Check the structural invariant: every primary-key name and every
    /// foreign-key local column must also appear in `columns`.
    pub fn validate(&self) -> Result<()> {
        for pk in &self.primary_key {
            if self.column(pk).is_none() {
                return Err(GatewayError::Schema(format!(
                    "table {}: primary key column '{}' is not in the column list",
                    self.name, pk
                )));
            }
        }
        for fk in &self.foreign_keys {
            if self.column(&fk.column).is_none() {
                return Err(GatewayError::Schema(format!(
                    "table {}: foreign key '{}' references local column '{}' which is not in the column list",
                    self.name, fk.name, fk.column
                )));
            }
        }
        Ok(())
    }
}
