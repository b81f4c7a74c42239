//! SQL statement construction.
//!
//! Statements are built from introspected metadata: only columns that exist
//! in the table participate, identifiers are bracket-quoted, and every data
//! value travels as a positional `@Pn` parameter. Raw `filter` and `where`
//! fragments are the one deliberate exception and are interpolated verbatim;
//! they must never carry end-user input.

pub mod pagination;

use serde_json::{Map, Value as Json};
use tracing::{info, warn};

use crate::binding::{coerce_value, BindingType, ParamBinding};
use crate::core::identifier::{qualify, quote};
use crate::core::schema::TableMetadata;
use crate::error::{GatewayError, Result};

pub use pagination::{build_paged_select, order_clause, OrderDirection, PagedSelect, PageRequest};

/// A statement with its positional parameters, ready for execution.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<ParamBinding>,
}

/// Build a `COUNT(*)` query, with the raw filter applied when present.
pub fn build_count(schema: &str, table: &str, filter: Option<&str>) -> Result<String> {
    let mut sql = format!("SELECT COUNT(*) FROM {}", qualify(schema, table)?);
    if let Some(f) = filter {
        if !f.trim().is_empty() {
            sql.push_str(&format!(" WHERE ({})", f));
        }
    }
    Ok(sql)
}

/// Build both paginated SELECT formulations for a table read.
///
/// The projection and ordering column come from introspected metadata, so
/// everything except the raw filter has already passed the allow-list.
pub fn build_select(
    schema: &str,
    meta: &TableMetadata,
    request: &PageRequest,
) -> Result<PagedSelect> {
    let columns = meta
        .columns
        .iter()
        .map(|c| quote(&c.name))
        .collect::<Result<Vec<_>>>()?;

    let order = match &request.order_by {
        Some(name) => {
            let column = meta.column(name).ok_or_else(|| {
                GatewayError::Validation(format!(
                    "order_by column '{}' does not exist in table '{}'",
                    name, meta.name
                ))
            })?;
            order_clause(Some(&quote(&column.name)?), request.direction)
        }
        None => order_clause(None, request.direction),
    };

    Ok(build_paged_select(
        &qualify(schema, &meta.name)?,
        &columns,
        &order,
        request,
    ))
}

/// Build an INSERT from a JSON object payload.
///
/// Identity columns, keys naming no real column, and NULL values aimed at
/// non-nullable columns are all skipped. Returns `Ok(None)` when nothing
/// remains to insert: an all-filtered payload is a no-op, not an error.
pub fn build_insert(
    schema: &str,
    meta: &TableMetadata,
    data: &Map<String, Json>,
) -> Result<Option<BoundStatement>> {
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for (key, value) in data {
        let Some(column) = meta.column(key) else {
            warn!(
                "Ignoring unknown column '{}' in insert payload for table '{}'",
                key, meta.name
            );
            continue;
        };
        if column.is_identity {
            continue;
        }
        if value.is_null() && !column.is_nullable {
            continue;
        }

        let ty = BindingType::resolve(&column.data_type);
        params.push(coerce_value(value, ty, &column.data_type));
        columns.push(quote(&column.name)?);
    }

    if columns.is_empty() {
        info!(
            "Insert into '{}' has no assignable columns, nothing to do",
            meta.name
        );
        return Ok(None);
    }

    let placeholders = (1..=columns.len())
        .map(|i| format!("@P{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualify(schema, &meta.name)?,
        columns.join(", "),
        placeholders
    );

    Ok(Some(BoundStatement { sql, params }))
}

/// Build an UPDATE from a JSON object payload and a raw where condition.
///
/// An empty where condition is rejected before construction; an unbounded
/// UPDATE must never be emitted. Identity columns and unknown keys are
/// skipped; NULL assignments are kept (unlike insert, an explicit NULL is
/// a meaningful update).
pub fn build_update(
    schema: &str,
    meta: &TableMetadata,
    data: &Map<String, Json>,
    where_condition: &str,
) -> Result<Option<BoundStatement>> {
    if where_condition.trim().is_empty() {
        return Err(GatewayError::Validation(
            "update requires a non-empty where condition".into(),
        ));
    }

    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for (key, value) in data {
        let Some(column) = meta.column(key) else {
            warn!(
                "Ignoring unknown column '{}' in update payload for table '{}'",
                key, meta.name
            );
            continue;
        };
        if column.is_identity {
            continue;
        }

        let ty = BindingType::resolve(&column.data_type);
        params.push(coerce_value(value, ty, &column.data_type));
        assignments.push(format!("{} = @P{}", quote(&column.name)?, params.len()));
    }

    if assignments.is_empty() {
        info!(
            "Update of '{}' has no assignable columns, nothing to do",
            meta.name
        );
        return Ok(None);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE ({})",
        qualify(schema, &meta.name)?,
        assignments.join(", "),
        where_condition
    );

    Ok(Some(BoundStatement { sql, params }))
}

/// Build a DELETE bounded by a raw where condition.
///
/// An empty condition is rejected; an unbounded DELETE must never be
/// emitted.
pub fn build_delete(schema: &str, table: &str, where_condition: &str) -> Result<String> {
    if where_condition.trim().is_empty() {
        return Err(GatewayError::Validation(
            "delete requires a non-empty where condition".into(),
        ));
    }
    Ok(format!(
        "DELETE FROM {} WHERE ({})",
        qualify(schema, table)?,
        where_condition
    ))
}
