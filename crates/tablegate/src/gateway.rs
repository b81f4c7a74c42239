//! The gateway facade: schema-driven table access over per-request
//! connections.
//!
//! Every public operation opens one connection, waits for readiness,
//! introspects whatever metadata it needs, runs its statements, and drops
//! the connection. Reads degrade to an empty envelope carrying the error
//! message; writes propagate errors to the caller.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::{info, warn};

use crate::config::Config;
use crate::connect::{self, Connection};
use crate::core::schema::TableMetadata;
use crate::core::value::Record;
use crate::error::{GatewayError, Result};
use crate::exec;
use crate::introspect;
use crate::query::{self, PagedSelect, PageRequest};

/// The read-path result envelope. Failures on the read path are folded
/// into this shape rather than propagated: consumers always get a
/// renderable page.
#[derive(Debug, Serialize)]
pub struct TableData {
    /// Rows for the requested page, in query order.
    pub data: Vec<Record>,

    /// Total row count for the table under the active filter, independent
    /// of pagination.
    pub total: i64,

    /// Error message when the read failed and the envelope degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableData {
    fn empty() -> Self {
        TableData {
            data: Vec::new(),
            total: 0,
            error: None,
        }
    }

    fn degraded(error: String) -> Self {
        TableData {
            data: Vec::new(),
            total: 0,
            error: Some(error),
        }
    }
}

/// Generic table-level data access against one configured database.
///
/// The gateway holds only configuration; connections are opened per
/// operation and never shared or reused.
pub struct TableGateway {
    config: Config,
}

impl TableGateway {
    #[must_use]
    pub fn new(config: Config) -> Self {
        TableGateway { config }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn schema(&self) -> &str {
        &self.config.connection.schema
    }

    /// Open a connection and wait for it to answer a round trip.
    async fn connect(&self) -> Result<Connection> {
        let mut client = connect::open(
            &self.config.connection,
            Duration::from_secs(self.config.gateway.connect_timeout_secs),
        )
        .await?;
        exec::ensure_ready(
            &mut client,
            Duration::from_secs(self.config.gateway.ready_timeout_secs),
        )
        .await?;
        Ok(client)
    }

    /// Verify connectivity and readiness without touching any table.
    pub async fn ping(&self) -> Result<()> {
        self.connect().await?;
        info!(
            "Database {}:{}/{} is reachable",
            self.config.connection.host, self.config.connection.port, self.config.connection.database
        );
        Ok(())
    }

    /// List base-table names in the configured schema.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let mut client = self.connect().await?;
        introspect::list_tables(&mut client, self.schema()).await
    }

    /// Introspect one table. Unknown tables yield empty metadata; known
    /// tables are checked for key/column consistency.
    pub async fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        let mut client = self.connect().await?;
        let meta = introspect::table_metadata(&mut client, self.schema(), table).await?;
        if !meta.is_empty() {
            meta.validate()?;
        }
        Ok(meta)
    }

    /// Introspect every base table in the configured schema. Tables whose
    /// metadata cannot be fetched are skipped, not fatal.
    pub async fn schema_metadata(&self) -> Result<Vec<TableMetadata>> {
        let mut client = self.connect().await?;
        introspect::schema_metadata(&mut client, self.schema()).await
    }

    /// Read one page of a table.
    ///
    /// Never returns an error: any failure degrades to an empty envelope
    /// carrying the message, so a rendering layer always has something to
    /// show. An unknown table is an empty envelope without an error.
    pub async fn get_table_data(&self, table: &str, request: &PageRequest) -> TableData {
        match self.read_page(table, request).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Read of table '{}' failed: {}", table, e);
                TableData::degraded(e.to_string())
            }
        }
    }

    async fn read_page(&self, table: &str, request: &PageRequest) -> Result<TableData> {
        let schema = self.schema();
        let mut client = self.connect().await?;

        let meta = introspect::table_metadata(&mut client, schema, table).await?;
        if meta.is_empty() {
            return Ok(TableData::empty());
        }
        meta.validate()?;

        let count_sql = query::build_count(schema, &meta.name, request.filter.as_deref())?;
        let count_rows = exec::execute(&mut client, &count_sql, &[]).await?;
        let total = count_rows
            .first()
            .and_then(Record::first_value)
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        let paged = query::build_select(schema, &meta, request)?;
        let mut runner = DriverRunner {
            client: &mut client,
        };
        let data = select_page(&mut runner, &paged, &meta.name).await?;

        Ok(TableData {
            data,
            total,
            error: None,
        })
    }

    /// Insert one row built from a JSON object payload. Returns the number
    /// of affected rows; a payload with nothing assignable is a no-op
    /// returning 0.
    pub async fn insert_record(&self, table: &str, data: &Map<String, Json>) -> Result<u64> {
        let schema = self.schema();
        let mut client = self.connect().await?;

        let meta = self.known_table(&mut client, table).await?;
        let Some(stmt) = query::build_insert(schema, &meta, data)? else {
            return Ok(0);
        };

        let affected = exec::execute_non_query(&mut client, &stmt.sql, &stmt.params).await?;
        info!("Inserted {} row(s) into '{}'", affected, meta.name);
        Ok(affected)
    }

    /// Update rows matched by a raw where condition. The condition is
    /// caller-constructed and must be non-empty.
    pub async fn update_record(
        &self,
        table: &str,
        data: &Map<String, Json>,
        where_condition: &str,
    ) -> Result<u64> {
        let schema = self.schema();
        let mut client = self.connect().await?;

        let meta = self.known_table(&mut client, table).await?;
        let Some(stmt) = query::build_update(schema, &meta, data, where_condition)? else {
            return Ok(0);
        };

        let affected = exec::execute_non_query(&mut client, &stmt.sql, &stmt.params).await?;
        info!("Updated {} row(s) in '{}'", affected, meta.name);
        Ok(affected)
    }

    /// Delete rows matched by a raw where condition. The condition is
    /// caller-constructed and must be non-empty.
    pub async fn delete_record(&self, table: &str, where_condition: &str) -> Result<u64> {
        let schema = self.schema();
        let mut client = self.connect().await?;

        let meta = self.known_table(&mut client, table).await?;
        let sql = query::build_delete(schema, &meta.name, where_condition)?;

        let affected = exec::execute_non_query(&mut client, &sql, &[]).await?;
        info!("Deleted {} row(s) from '{}'", affected, meta.name);
        Ok(affected)
    }

    /// Introspect a table for a write path. Unlike reads, a write against
    /// an unknown table is rejected.
    async fn known_table(&self, client: &mut Connection, table: &str) -> Result<TableMetadata> {
        let meta = introspect::table_metadata(client, self.schema(), table).await?;
        if meta.is_empty() {
            return Err(GatewayError::Validation(format!(
                "table '{}' does not exist in schema '{}'",
                table,
                self.schema()
            )));
        }
        meta.validate()?;
        Ok(meta)
    }
}

/// Runs a row-returning statement. Seam between page selection and the
/// driver.
trait StatementRunner {
    async fn fetch(&mut self, sql: &str) -> Result<Vec<Record>>;
}

struct DriverRunner<'a> {
    client: &'a mut Connection,
}

impl StatementRunner for DriverRunner<'_> {
    async fn fetch(&mut self, sql: &str) -> Result<Vec<Record>> {
        exec::execute(self.client, sql, &[]).await
    }
}

/// Run a paginated select: the OFFSET/FETCH statement first, then the row
/// numbering statement once if the first fails. The fallback is attempted
/// exactly once; when it also fails, the second error wins and surfaces as
/// a query error.
async fn select_page<R: StatementRunner>(
    runner: &mut R,
    paged: &PagedSelect,
    table: &str,
) -> Result<Vec<Record>> {
    match runner.fetch(&paged.modern).await {
        Ok(rows) => Ok(rows),
        Err(first) => {
            warn!(
                "OFFSET/FETCH pagination failed for '{}', retrying with row numbering: {}",
                table, first
            );
            match runner.fetch(&paged.legacy).await {
                Ok(rows) => Ok(rows),
                Err(err @ GatewayError::Query { .. }) => Err(err),
                Err(second) => Err(GatewayError::query(second.to_string(), &paged.legacy)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use std::collections::VecDeque;

    /// Replays scripted outcomes and records the statements it was asked
    /// to run.
    struct ScriptedRunner {
        outcomes: VecDeque<Result<Vec<Record>>>,
        statements: Vec<String>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<Vec<Record>>>) -> Self {
            ScriptedRunner {
                outcomes: outcomes.into(),
                statements: Vec::new(),
            }
        }
    }

    impl StatementRunner for ScriptedRunner {
        async fn fetch(&mut self, sql: &str) -> Result<Vec<Record>> {
            self.statements.push(sql.to_string());
            self.outcomes.pop_front().expect("ran out of outcomes")
        }
    }

    fn paged() -> PagedSelect {
        PagedSelect {
            modern: "SELECT [Id] FROM [dbo].[Orders] ORDER BY (SELECT NULL) \
                     OFFSET 10 ROWS FETCH NEXT 10 ROWS ONLY"
                .to_string(),
            legacy: "SELECT [Id] FROM (SELECT [Id], ROW_NUMBER() OVER (ORDER BY (SELECT NULL)) \
                     AS row_num FROM [dbo].[Orders]) AS paged \
                     WHERE paged.row_num BETWEEN 11 AND 20 ORDER BY paged.row_num"
                .to_string(),
        }
    }

    fn row(id: i32) -> Record {
        let mut rec = Record::with_capacity(1);
        rec.push("Id", Value::I32(id));
        rec
    }

    #[tokio::test]
    async fn test_modern_success_never_runs_fallback() {
        let paged = paged();
        let mut runner = ScriptedRunner::new(vec![Ok(vec![row(1), row(2)])]);

        let rows = select_page(&mut runner, &paged, "Orders").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(runner.statements, vec![paged.modern.clone()]);
    }

    #[tokio::test]
    async fn test_fallback_result_returned_when_modern_fails() {
        let paged = paged();
        let mut runner = ScriptedRunner::new(vec![
            Err(GatewayError::query("OFFSET not supported", &paged.modern)),
            Ok(vec![row(11)]),
        ]);

        let rows = select_page(&mut runner, &paged, "Orders").await.unwrap();
        assert_eq!(rows, vec![row(11)]);
        assert_eq!(
            runner.statements,
            vec![paged.modern.clone(), paged.legacy.clone()]
        );
    }

    #[tokio::test]
    async fn test_second_failure_wins_and_is_a_query_error() {
        let paged = paged();
        let mut runner = ScriptedRunner::new(vec![
            Err(GatewayError::query("first failure", &paged.modern)),
            Err(GatewayError::Connection("socket closed".to_string())),
        ]);

        let err = select_page(&mut runner, &paged, "Orders")
            .await
            .unwrap_err();
        match err {
            GatewayError::Query { message, .. } => {
                assert!(message.contains("socket closed"));
                assert!(!message.contains("first failure"));
            }
            other => panic!("expected Query variant, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_attempted_only_once() {
        let paged = paged();
        let mut runner = ScriptedRunner::new(vec![
            Err(GatewayError::query("first failure", &paged.modern)),
            Err(GatewayError::query("second failure", &paged.legacy)),
        ]);

        let err = select_page(&mut runner, &paged, "Orders")
            .await
            .unwrap_err();
        assert_eq!(runner.statements.len(), 2);
        match err {
            GatewayError::Query { message, .. } => assert_eq!(message, "second failure"),
            other => panic!("expected Query variant, got {:?}", other),
        }
    }
}
