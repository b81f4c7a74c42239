//! Schema introspection against the engine's catalog views.
//!
//! Discovers tables, columns, primary keys, and foreign keys at request
//! time; nothing is cached. Schema and table names are always bound as
//! parameters (`@P1`/`@P2`), never interpolated into catalog literals.

use tiberius::Query;
use tracing::{debug, info, warn};

use crate::connect::Connection;
use crate::core::schema::{ColumnMetadata, ForeignKeyMetadata, TableMetadata};
use crate::error::{GatewayError, Result};

/// List base-table names in the given schema, ordered lexicographically.
pub async fn list_tables(client: &mut Connection, schema: &str) -> Result<Vec<String>> {
    let sql = r#"
        SELECT t.TABLE_NAME
        FROM INFORMATION_SCHEMA.TABLES t
        WHERE t.TABLE_TYPE = 'BASE TABLE'
          AND t.TABLE_SCHEMA = @P1
        ORDER BY t.TABLE_NAME
    "#;

    let mut query = Query::new(sql);
    query.bind(schema);

    let stream = query
        .query(client)
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;
    let rows = stream
        .into_first_result()
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;

    let tables = rows
        .iter()
        .filter_map(|row| row.get::<&str, _>(0).map(String::from))
        .collect::<Vec<_>>();

    debug!("Found {} base tables in schema '{}'", tables.len(), schema);
    Ok(tables)
}

/// Discover full metadata for a named table.
///
/// Issues three read-only catalog queries (columns, primary keys, foreign
/// keys), serialized over the single TDS connection; the driver does not
/// multiplex requests and serialization is always safe. An unknown table
/// yields empty metadata rather than an error - the caller checks
/// [`TableMetadata::is_empty`].
pub async fn table_metadata(
    client: &mut Connection,
    schema: &str,
    table: &str,
) -> Result<TableMetadata> {
    let columns = load_columns(client, schema, table).await?;
    if columns.is_empty() {
        debug!("Table '{}.{}' has no columns (unknown table)", schema, table);
        return Ok(TableMetadata::empty(table));
    }

    let primary_key = load_primary_key(client, schema, table).await?;
    let foreign_keys = load_foreign_keys(client, schema, table).await?;

    debug!(
        "Introspected {}.{}: {} columns, {} pk columns, {} foreign keys",
        schema,
        table,
        columns.len(),
        primary_key.len(),
        foreign_keys.len()
    );

    Ok(TableMetadata {
        name: table.to_string(),
        columns,
        primary_key,
        foreign_keys,
    })
}

/// Discover metadata for every base table in the schema.
///
/// One table's metadata failure is logged and skipped; it never aborts
/// enumeration of the others.
pub async fn schema_metadata(client: &mut Connection, schema: &str) -> Result<Vec<TableMetadata>> {
    let names = list_tables(client, schema).await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        match table_metadata(client, schema, &name).await {
            Ok(meta) => tables.push(meta),
            Err(e) => warn!("Skipping table '{}': metadata fetch failed: {}", name, e),
        }
    }

    info!("Introspected {} tables in schema '{}'", tables.len(), schema);
    Ok(tables)
}

/// Load columns in physical ordinal order, with the identity flag.
async fn load_columns(
    client: &mut Connection,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnMetadata>> {
    let sql = r#"
        SELECT
            COLUMN_NAME,
            DATA_TYPE,
            CASE WHEN IS_NULLABLE = 'YES' THEN 1 ELSE 0 END,
            CAST(CHARACTER_MAXIMUM_LENGTH AS INT),
            CAST(NUMERIC_PRECISION AS INT),
            CAST(NUMERIC_SCALE AS INT),
            ISNULL(COLUMNPROPERTY(OBJECT_ID(TABLE_SCHEMA + '.' + TABLE_NAME), COLUMN_NAME, 'IsIdentity'), 0)
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
        ORDER BY ORDINAL_POSITION
    "#;

    let mut query = Query::new(sql);
    query.bind(schema);
    query.bind(table);

    let stream = query
        .query(client)
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;
    let rows = stream
        .into_first_result()
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push(ColumnMetadata {
            name: row.get::<&str, _>(0).unwrap_or_default().to_string(),
            data_type: row
                .get::<&str, _>(1)
                .unwrap_or_default()
                .to_ascii_lowercase(),
            is_nullable: row.get::<i32, _>(2).unwrap_or(0) == 1,
            max_length: row.get::<i32, _>(3),
            precision: row.get::<i32, _>(4),
            scale: row.get::<i32, _>(5),
            is_identity: row.get::<i32, _>(6).unwrap_or(0) == 1,
        });
    }

    Ok(columns)
}

/// Load primary key column names, in key ordinal order.
async fn load_primary_key(
    client: &mut Connection,
    schema: &str,
    table: &str,
) -> Result<Vec<String>> {
    let sql = r#"
        SELECT c.COLUMN_NAME
        FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE c
            ON c.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            AND c.TABLE_SCHEMA = tc.TABLE_SCHEMA
            AND c.TABLE_NAME = tc.TABLE_NAME
        WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
          AND tc.TABLE_SCHEMA = @P1
          AND tc.TABLE_NAME = @P2
        ORDER BY c.ORDINAL_POSITION
    "#;

    let mut query = Query::new(sql);
    query.bind(schema);
    query.bind(table);

    let stream = query
        .query(client)
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;
    let rows = stream
        .into_first_result()
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;

    Ok(rows
        .iter()
        .filter_map(|row| row.get::<&str, _>(0).map(String::from))
        .collect())
}

/// Load foreign keys, one entry per referencing column pair.
async fn load_foreign_keys(
    client: &mut Connection,
    schema: &str,
    table: &str,
) -> Result<Vec<ForeignKeyMetadata>> {
    let sql = r#"
        SELECT
            fk.name,
            pc.name AS column_name,
            rt.name AS referenced_table,
            rc.name AS referenced_column
        FROM sys.foreign_keys fk
        JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
        JOIN sys.columns pc ON fkc.parent_object_id = pc.object_id AND fkc.parent_column_id = pc.column_id
        JOIN sys.tables pt ON fk.parent_object_id = pt.object_id
        JOIN sys.schemas ps ON pt.schema_id = ps.schema_id
        JOIN sys.tables rt ON fk.referenced_object_id = rt.object_id
        JOIN sys.columns rc ON fkc.referenced_object_id = rc.object_id AND fkc.referenced_column_id = rc.column_id
        WHERE ps.name = @P1 AND pt.name = @P2
        ORDER BY fk.name, fkc.constraint_column_id
    "#;

    let mut query = Query::new(sql);
    query.bind(schema);
    query.bind(table);

    let stream = query
        .query(client)
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;
    let rows = stream
        .into_first_result()
        .await
        .map_err(|e| GatewayError::from_driver(e, sql))?;

    let mut keys = Vec::with_capacity(rows.len());
    for row in rows {
        keys.push(ForeignKeyMetadata {
            name: row.get::<&str, _>(0).unwrap_or_default().to_string(),
            column: row.get::<&str, _>(1).unwrap_or_default().to_string(),
            referenced_table: row.get::<&str, _>(2).unwrap_or_default().to_string(),
            referenced_column: row.get::<&str, _>(3).unwrap_or_default().to_string(),
        });
    }

    Ok(keys)
}
