//! DuckDB backend implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::config::PoolConfig;
use crate::dialect::DuckDbDialect;
use crate::error::{Result, SqllessError};
use crate::executor::{ColumnMeta, QueryResult};

use super::{ColumnSchema, WarehouseConnection};

/// DuckDB connection implementing the warehouse trait.
///
/// DuckDB calls the attached database a catalog; for a file database it is
/// the file stem (`sales.duckdb` → `sales`).
#[derive(Clone)]
pub struct DuckDbConnection {
    database_path: PathBuf,
    dialect: DuckDbDialect,
    limiter: Arc<Semaphore>,
    pool: Arc<Mutex<Vec<duckdb::Connection>>>,
}

impl DuckDbConnection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_pool_config(path, &PoolConfig::default())
    }

    pub fn with_pool_config<P: AsRef<Path>>(path: P, pool: &PoolConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        let max_concurrency = pool.size.max(1);
        tracing::info!(path = %path.display(), max_concurrency, "creating DuckDB connection");
        Self {
            database_path: path,
            dialect: DuckDbDialect,
            limiter: Arc::new(Semaphore::new(max_concurrency)),
            pool: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        if self.limiter.available_permits() == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .acquire()
            .await
            .map_err(|e| SqllessError::Execution(format!("limiter closed: {e}")))
    }

    async fn checkout_connection(&self) -> Result<duckdb::Connection> {
        let mut guard = self.pool.lock().await;
        if let Some(conn) = guard.pop() {
            tracing::trace!(pool_remaining = guard.len(), "reusing pooled DuckDB connection");
            return Ok(conn);
        }
        drop(guard);
        tracing::debug!(path = %self.database_path.display(), "opening new DuckDB connection");
        duckdb::Connection::open(self.database_path.clone())
            .map_err(|e| SqllessError::Execution(format!("open duckdb: {e}")))
    }

    /// Run `work` on a pooled connection off the async runtime.
    async fn run_blocking<T, F>(&self, op: &'static str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Connection) -> Result<T> + Send + 'static,
    {
        let _permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;
        let (outcome, conn) = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let outcome = work(&conn);
            tracing::debug!(op, ms = start.elapsed().as_millis() as u64, "duckdb call");
            (outcome, conn)
        })
        .await
        .map_err(|e| SqllessError::Execution(format!("task join error: {e}")))?;
        self.pool.lock().await.push(conn);
        outcome
    }
}

fn query_strings(
    conn: &duckdb::Connection,
    sql: &str,
    params: &[&dyn duckdb::ToSql],
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[async_trait]
impl WarehouseConnection for DuckDbConnection {
    fn dialect(&self) -> &(dyn crate::dialect::Dialect + Send + Sync) {
        &self.dialect
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        self.run_blocking("list_databases", |conn| {
            query_strings(
                conn,
                "SELECT DISTINCT catalog_name FROM information_schema.schemata \
                 WHERE catalog_name NOT IN ('system', 'temp') ORDER BY catalog_name",
                &[],
            )
        })
        .await
    }

    async fn list_schemas(&self, database: &str) -> Result<Vec<String>> {
        let database = database.to_string();
        self.run_blocking("list_schemas", move |conn| {
            query_strings(
                conn,
                "SELECT schema_name FROM information_schema.schemata \
                 WHERE catalog_name = ? \
                 AND schema_name NOT IN ('information_schema', 'pg_catalog') \
                 ORDER BY schema_name",
                &[&database],
            )
        })
        .await
    }

    async fn list_tables(&self, database: &str, schema: &str) -> Result<Vec<String>> {
        let database = database.to_string();
        let schema = schema.to_string();
        self.run_blocking("list_tables", move |conn| {
            query_strings(
                conn,
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_catalog = ? AND table_schema = ? AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                &[&database, &schema],
            )
        })
        .await
    }

    async fn describe_columns(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnSchema>> {
        let database = database.to_string();
        let schema = schema.to_string();
        let table = table.to_string();
        self.run_blocking("describe_columns", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_catalog = ? AND table_schema = ? AND table_name = ? \
                 ORDER BY ordinal_position",
            )?;
            let rows = stmt.query_map(duckdb::params![database, schema, table], |row| {
                Ok(ColumnSchema {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.to_string();
        self.run_blocking("execute_sql", move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows_iter = stmt.query([])?;
            let stmt_ref = rows_iter
                .as_ref()
                .ok_or_else(|| SqllessError::Execution("statement missing".to_string()))?;
            let mut column_names = Vec::new();
            for idx in 0..stmt_ref.column_count() {
                let name = stmt_ref
                    .column_name(idx)
                    .map_err(|e| SqllessError::Execution(e.to_string()))?;
                column_names.push(name.to_string());
            }
            let mut rows = Vec::new();
            while let Some(row) = rows_iter.next()? {
                let mut map = serde_json::Map::new();
                for (idx, name) in column_names.iter().enumerate() {
                    let value = crate::executor::duck_value_to_json(row.get_ref(idx)?.to_owned());
                    map.insert(name.clone(), value);
                }
                rows.push(map);
            }
            tracing::debug!(rows = rows.len(), columns = column_names.len(), "duckdb execute_sql");
            Ok(QueryResult {
                columns: column_names
                    .into_iter()
                    .map(|name| ColumnMeta { name })
                    .collect(),
                rows,
            })
        })
        .await
    }
}
