//! Shared fixtures: an in-process warehouse that serves canned metadata and
//! records every statement it is asked to run.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value};
use sqlless::catalog::{classify, CatalogSnapshot, ColumnDescriptor, TableDescriptor};
use sqlless::config::CatalogConfig;
use sqlless::dialect::{Dialect, SnowflakeDialect};
use sqlless::error::{Result, SqllessError};
use sqlless::executor::{ColumnMeta, QueryResult};
use sqlless::{ColumnSchema, WarehouseConnection};

pub const DB: &str = "DB";
pub const SCHEMA: &str = "PUBLIC";

#[derive(Default)]
pub struct FakeWarehouse {
    tables: Mutex<BTreeMap<String, Vec<ColumnSchema>>>,
    failing_tables: HashSet<String>,
    distinct: HashMap<String, Vec<String>>,
    failing_probes: HashSet<String>,
    responses: Vec<(String, QueryResult)>,
    execution_error: Mutex<Option<String>>,
    listing_error: bool,
    delay: Option<Duration>,
    executed: Mutex<Vec<String>>,
    describe_calls: AtomicUsize,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders, customers and products, the way most tests want them.
    pub fn shop() -> Self {
        Self::new()
            .with_table(
                "ORDERS",
                &[
                    ("ORDER_ID", "NUMBER(38,0)"),
                    ("CUSTOMER_ID", "NUMBER(38,0)"),
                    ("ORDER_STATUS", "VARCHAR(16777216)"),
                    ("AMOUNT", "NUMBER(10,2)"),
                    ("CREATED_AT", "TIMESTAMP_NTZ"),
                    ("NOTE", "VARCHAR"),
                ],
            )
            .with_table(
                "CUSTOMERS",
                &[
                    ("ID", "NUMBER(38,0)"),
                    ("NAME", "VARCHAR"),
                    ("REGION", "VARCHAR"),
                ],
            )
            .with_table("PRODUCTS", &[("SKU", "VARCHAR"), ("PRICE", "FLOAT")])
            .with_distinct("ORDER_STATUS", &["pending", "shipped"])
            .with_distinct("REGION", &["East", "West"])
    }

    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.set_columns(name, columns);
        self
    }

    pub fn with_failing_table(mut self, name: &str) -> Self {
        self.failing_tables.insert(name.to_string());
        self
    }

    pub fn with_distinct(mut self, column: &str, values: &[&str]) -> Self {
        self.distinct.insert(
            column.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub fn with_failing_probe(mut self, column: &str) -> Self {
        self.failing_probes.insert(column.to_string());
        self
    }

    /// Answer statements starting with `prefix` with `result`.
    pub fn with_response(mut self, prefix: &str, result: QueryResult) -> Self {
        self.responses.push((prefix.to_string(), result));
        self
    }

    /// Reject every non-probe statement with `message`.
    pub fn with_execution_error(self, message: &str) -> Self {
        self.set_execution_error(Some(message));
        self
    }

    pub fn set_execution_error(&self, message: Option<&str>) {
        *self.execution_error.lock().unwrap() = message.map(str::to_string);
    }

    pub fn with_listing_error(mut self) -> Self {
        self.listing_error = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace a table's columns, as if it were altered behind the session's back.
    pub fn set_columns(&self, name: &str, columns: &[(&str, &str)]) {
        self.tables.lock().unwrap().insert(
            name.to_string(),
            columns
                .iter()
                .map(|(n, t)| ColumnSchema::new(*n, *t))
                .collect(),
        );
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Executed statements other than distinct-value probes.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| !sql.starts_with("SELECT DISTINCT"))
            .collect()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

pub fn rows(column: &str, values: &[Value]) -> QueryResult {
    QueryResult {
        columns: vec![ColumnMeta {
            name: column.to_string(),
        }],
        rows: values
            .iter()
            .map(|v| {
                let mut row = Map::new();
                row.insert(column.to_string(), v.clone());
                row
            })
            .collect(),
    }
}

fn probe_column(sql: &str) -> Option<&str> {
    let rest = sql.strip_prefix("SELECT DISTINCT ")?;
    rest.split_whitespace().next()
}

#[async_trait::async_trait]
impl WarehouseConnection for FakeWarehouse {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        &SnowflakeDialect
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        if self.listing_error {
            return Err(SqllessError::Catalog("permission denied".to_string()));
        }
        Ok(vec![DB.to_string()])
    }

    async fn list_schemas(&self, database: &str) -> Result<Vec<String>> {
        if self.listing_error {
            return Err(SqllessError::Catalog("permission denied".to_string()));
        }
        Ok(if database == DB {
            vec![SCHEMA.to_string(), "EMPTY".to_string()]
        } else {
            Vec::new()
        })
    }

    async fn list_tables(&self, database: &str, schema: &str) -> Result<Vec<String>> {
        if self.listing_error {
            return Err(SqllessError::Catalog("permission denied".to_string()));
        }
        if database != DB || schema != SCHEMA {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
        names.extend(self.failing_tables.iter().cloned());
        names.sort();
        Ok(names)
    }

    async fn describe_columns(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnSchema>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_tables.contains(table) {
            return Err(SqllessError::Catalog(format!("table {table} is not authorized")));
        }
        if database != DB || schema != SCHEMA {
            return Ok(Vec::new());
        }
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    async fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(column) = probe_column(sql) {
            if self.failing_probes.contains(column) {
                return Err(SqllessError::Execution(format!("probe on {column} denied")));
            }
            let values: Vec<Value> = self
                .distinct
                .get(column)
                .map(|vals| vals.iter().map(|v| Value::String(v.clone())).collect())
                .unwrap_or_default();
            return Ok(rows(column, &values));
        }

        if let Some((_, result)) = self.responses.iter().find(|(p, _)| sql.starts_with(p)) {
            return Ok(result.clone());
        }
        if let Some(message) = self.execution_error.lock().unwrap().clone() {
            return Err(SqllessError::Execution(message));
        }
        Ok(rows("RECORD_COUNT", &[Value::from(1)]))
    }
}

/// Describe a table without a warehouse, classifying with default keywords.
pub fn descriptor(table: &str, columns: &[(&str, &str)]) -> TableDescriptor {
    let keywords = CatalogConfig::default().categorical_keywords;
    TableDescriptor {
        database: DB.to_string(),
        schema: SCHEMA.to_string(),
        table: table.to_string(),
        columns: columns
            .iter()
            .map(|(name, ty)| ColumnDescriptor::new(*name, *ty, classify(name, ty, &keywords)))
            .collect(),
    }
}

pub fn shop_snapshot() -> CatalogSnapshot {
    CatalogSnapshot::new()
        .with_table(descriptor(
            "ORDERS",
            &[
                ("ORDER_ID", "NUMBER(38,0)"),
                ("CUSTOMER_ID", "NUMBER(38,0)"),
                ("ORDER_STATUS", "VARCHAR"),
                ("AMOUNT", "NUMBER(10,2)"),
                ("CREATED_AT", "TIMESTAMP_NTZ"),
            ],
        ))
        .with_table(descriptor(
            "CUSTOMERS",
            &[("ID", "NUMBER(38,0)"), ("NAME", "VARCHAR"), ("REGION", "VARCHAR")],
        ))
}
