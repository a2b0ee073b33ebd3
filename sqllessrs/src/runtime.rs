use std::time::Duration;

use crate::backends::WarehouseConnection;
use crate::error::{Result, SqllessError};
use crate::executor::QueryResult;

/// Run compiled SQL on the warehouse, bounded by `timeout` when given.
pub async fn run_sql(
    warehouse: &dyn WarehouseConnection,
    sql: &str,
    timeout: Option<Duration>,
) -> Result<QueryResult> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, warehouse.execute_sql(sql))
            .await
            .map_err(|_| {
                SqllessError::Execution(format!(
                    "query timed out after {} ms",
                    limit.as_millis()
                ))
            })?,
        None => warehouse.execute_sql(sql).await,
    }
}

/// Timeout from a configured millisecond value; `0` disables it.
pub fn timeout_from_millis(timeout_ms: u64) -> Option<Duration> {
    (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms))
}
