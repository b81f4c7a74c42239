//! Statement execution over a single connection.
//!
//! Parameters are bound positionally in builder order; result rows become
//! [`Record`]s preserving the column order the engine emitted. Conversion
//! is driven by the driver-reported column type of each result column, so
//! the executor works for any projection, not just full-table reads.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tiberius::{ColumnType, Query, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::binding::ParamBinding;
use crate::connect::Connection;
use crate::core::value::{Record, Value};
use crate::error::{GatewayError, Result};

/// Interval between readiness probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Confirm the connection answers a trivial round trip, polling with a
/// bounded wait. A connection that never becomes ready within
/// `ready_timeout` fails with a connection error; a transport-level probe
/// failure fails immediately since the connection is permanently gone.
pub async fn ensure_ready(client: &mut Connection, ready_timeout: Duration) -> Result<()> {
    tokio::time::timeout(ready_timeout, async {
        loop {
            match client.simple_query("SELECT 1").await {
                Ok(stream) => {
                    stream
                        .into_results()
                        .await
                        .map_err(|e| GatewayError::from_driver(e, "SELECT 1"))?;
                    return Ok(());
                }
                Err(e) => match GatewayError::from_driver(e, "SELECT 1") {
                    err @ GatewayError::Connection(_) => return Err(err),
                    err => {
                        warn!("Readiness probe failed, retrying: {}", err);
                        tokio::time::sleep(READY_POLL_INTERVAL).await;
                    }
                },
            }
        }
    })
    .await
    .map_err(|_| {
        GatewayError::connection(format!(
            "connection did not become ready within {:?}",
            ready_timeout
        ))
    })?
}

/// Run a row-returning statement and collect the results as ordered
/// records.
pub async fn execute(
    client: &mut Connection,
    sql: &str,
    params: &[ParamBinding],
) -> Result<Vec<Record>> {
    let mut query = Query::new(sql);
    for param in params {
        param.apply(&mut query);
    }

    let stream = query
        .query(client)
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;
    let rows = stream
        .into_first_result()
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(row_to_record(&row));
    }

    debug!("Statement returned {} rows", records.len());
    Ok(records)
}

/// Run a statement that returns no rows; yields the affected-row count.
pub async fn execute_non_query(
    client: &mut Connection,
    sql: &str,
    params: &[ParamBinding],
) -> Result<u64> {
    let mut query = Query::new(sql);
    for param in params {
        param.apply(&mut query);
    }

    let result = query
        .execute(client)
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;
    let affected = result.rows_affected().iter().sum();

    debug!("Statement affected {} rows", affected);
    Ok(affected)
}

/// Convert one result row into a record, preserving the engine's column
/// order and declared output names.
fn row_to_record(row: &Row) -> Record {
    let columns: Vec<(String, ColumnType)> = row
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.column_type()))
        .collect();

    let mut record = Record::with_capacity(columns.len());
    for (idx, (name, ty)) in columns.into_iter().enumerate() {
        record.push(name, convert_column(row, idx, ty));
    }
    record
}

/// Extract one column value by its driver-reported wire type. A value the
/// driver cannot hand over in the expected shape becomes NULL rather than
/// a failure.
fn convert_column(row: &Row, idx: usize, ty: ColumnType) -> Value {
    match ty {
        ColumnType::Null => Value::Null,

        ColumnType::Bit | ColumnType::Bitn => row
            .try_get::<bool, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        ColumnType::Int1 => row
            .try_get::<u8, _>(idx)
            .ok()
            .flatten()
            .map(Value::U8)
            .unwrap_or(Value::Null),
        ColumnType::Int2 => row
            .try_get::<i16, _>(idx)
            .ok()
            .flatten()
            .map(Value::I16)
            .unwrap_or(Value::Null),
        ColumnType::Int4 => row
            .try_get::<i32, _>(idx)
            .ok()
            .flatten()
            .map(Value::I32)
            .unwrap_or(Value::Null),
        ColumnType::Int8 => row
            .try_get::<i64, _>(idx)
            .ok()
            .flatten()
            .map(Value::I64)
            .unwrap_or(Value::Null),
        // Nullable integers report Intn without a fixed width.
        ColumnType::Intn => int_of_any_width(row, idx),

        ColumnType::Float4 => row
            .try_get::<f32, _>(idx)
            .ok()
            .flatten()
            .map(Value::F32)
            .unwrap_or(Value::Null),
        ColumnType::Float8 => row
            .try_get::<f64, _>(idx)
            .ok()
            .flatten()
            .map(Value::F64)
            .unwrap_or(Value::Null),
        ColumnType::Floatn => row
            .try_get::<f64, _>(idx)
            .ok()
            .flatten()
            .map(Value::F64)
            .or_else(|| {
                row.try_get::<f32, _>(idx)
                    .ok()
                    .flatten()
                    .map(Value::F32)
            })
            .unwrap_or(Value::Null),

        ColumnType::Decimaln | ColumnType::Numericn => row
            .try_get::<Decimal, _>(idx)
            .ok()
            .flatten()
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        ColumnType::Money | ColumnType::Money4 => row
            .try_get::<f64, _>(idx)
            .ok()
            .flatten()
            .map(Value::F64)
            .unwrap_or(Value::Null),

        ColumnType::Guid => row
            .try_get::<Uuid, _>(idx)
            .ok()
            .flatten()
            .map(Value::Uuid)
            .unwrap_or(Value::Null),

        ColumnType::Datetime
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::Datetime2 => row
            .try_get::<NaiveDateTime, _>(idx)
            .ok()
            .flatten()
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        ColumnType::Daten => row
            .try_get::<NaiveDate, _>(idx)
            .ok()
            .flatten()
            .map(Value::Date)
            .unwrap_or(Value::Null),
        ColumnType::Timen => row
            .try_get::<NaiveTime, _>(idx)
            .ok()
            .flatten()
            .map(Value::Time)
            .unwrap_or(Value::Null),
        ColumnType::DatetimeOffsetn => row
            .try_get::<DateTime<Utc>, _>(idx)
            .ok()
            .flatten()
            .map(|dt| Value::DateTimeOffset(dt.fixed_offset()))
            .unwrap_or(Value::Null),

        ColumnType::BigBinary | ColumnType::BigVarBin | ColumnType::Image | ColumnType::Udt => {
            row.try_get::<&[u8], _>(idx)
                .ok()
                .flatten()
                .map(|b| Value::Bytes(b.to_vec()))
                .unwrap_or(Value::Null)
        }

        // Character types, xml, sql_variant, and anything else surface as text.
        _ => row
            .try_get::<&str, _>(idx)
            .ok()
            .flatten()
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null),
    }
}

fn int_of_any_width(row: &Row, idx: usize) -> Value {
    if let Ok(Some(v)) = row.try_get::<i32, _>(idx) {
        return Value::I32(v);
    }
    if let Ok(Some(v)) = row.try_get::<i64, _>(idx) {
        return Value::I64(v);
    }
    if let Ok(Some(v)) = row.try_get::<i16, _>(idx) {
        return Value::I16(v);
    }
    if let Ok(Some(v)) = row.try_get::<u8, _>(idx) {
        return Value::U8(v);
    }
    Value::Null
}
