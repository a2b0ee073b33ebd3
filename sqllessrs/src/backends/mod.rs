//! Warehouse backend implementations.
//!
//! Each backend is implemented in its own file and gated behind a feature flag.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ResolvedDatasourceConfig, SqllessConfig};
use crate::dialect::Dialect;
use crate::error::{Result, SqllessError};
use crate::executor::QueryResult;
use crate::session::Session;

/// Column metadata as the warehouse reports it, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// The five warehouse capabilities the query core depends on.
#[async_trait]
pub trait WarehouseConnection: Send + Sync {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);
    async fn list_databases(&self) -> Result<Vec<String>>;
    async fn list_schemas(&self, database: &str) -> Result<Vec<String>>;
    async fn list_tables(&self, database: &str, schema: &str) -> Result<Vec<String>>;
    /// Columns in ordinal order. An unknown table yields an empty list.
    async fn describe_columns(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnSchema>>;
    async fn execute_sql(&self, sql: &str) -> Result<QueryResult>;
}

/// Named warehouse connections plus the configuration used to open sessions on them.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: HashMap<String, Arc<dyn WarehouseConnection>>,
    config: Option<SqllessConfig>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection manager with configuration.
    pub fn with_config(config: SqllessConfig) -> Self {
        Self {
            connections: HashMap::new(),
            config: Some(config),
        }
    }

    pub fn config(&self) -> Option<&SqllessConfig> {
        self.config.as_ref()
    }

    /// Get resolved configuration for a specific datasource.
    pub fn config_for(&self, name: &str) -> ResolvedDatasourceConfig {
        match &self.config {
            Some(cfg) => cfg.for_datasource(name),
            None => SqllessConfig::default().for_datasource(name),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, conn: Arc<dyn WarehouseConnection>) {
        self.connections.insert(name.into(), conn);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn WarehouseConnection>> {
        self.connections.get(name)
    }

    /// Open a fresh interactive session against the named datasource.
    pub fn session(&self, name: &str) -> Result<Session> {
        let conn = self.get(name).ok_or_else(|| {
            SqllessError::Validation(format!("data source {name} not registered"))
        })?;
        Ok(Session::with_config(conn.clone(), &self.config_for(name)))
    }
}

// Feature-gated backend implementations
#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbConnection;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnection;
