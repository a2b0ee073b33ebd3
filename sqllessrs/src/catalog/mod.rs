//! Metadata catalog: enumerates warehouse objects and classifies columns.
//!
//! Every lookup degrades instead of failing. A listing that errors comes back
//! empty, a table that cannot be described comes back `None`, and the cause
//! is logged. Successful lookups are cached until the TTL runs out or
//! [`Catalog::reload`] drops the whole cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::backends::{ColumnSchema, WarehouseConnection};
use crate::config::CatalogConfig;
use crate::error::Result;
use crate::query_state::{QueryState, TableRef};
use crate::schema_cache::SchemaCache;

mod classify;
mod snapshot;

pub use classify::{
    classify, has_categorical_name, is_numeric_type, is_string_type, is_temporal_type, FilterKind,
};
pub use snapshot::{CatalogSnapshot, ColumnDescriptor, TableDescriptor};

/// database → schema → table names.
pub type CatalogTree = BTreeMap<String, BTreeMap<String, Vec<String>>>;

pub struct Catalog {
    warehouse: Arc<dyn WarehouseConnection>,
    config: CatalogConfig,
    databases: SchemaCache<(), Vec<String>>,
    schemas: SchemaCache<String, Vec<String>>,
    tables: SchemaCache<(String, String), Vec<String>>,
    columns: SchemaCache<TableRef, TableDescriptor>,
}

impl Catalog {
    pub fn new(warehouse: Arc<dyn WarehouseConnection>) -> Self {
        Self::with_config(warehouse, CatalogConfig::default())
    }

    pub fn with_config(warehouse: Arc<dyn WarehouseConnection>, config: CatalogConfig) -> Self {
        Self {
            warehouse,
            databases: SchemaCache::with_config(&config),
            schemas: SchemaCache::with_config(&config),
            tables: SchemaCache::with_config(&config),
            columns: SchemaCache::with_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn warehouse(&self) -> &Arc<dyn WarehouseConnection> {
        &self.warehouse
    }

    pub async fn list_databases(&mut self) -> Vec<String> {
        if let Some(hit) = self.databases.get(&()) {
            return hit.clone();
        }
        match self.warehouse.list_databases().await {
            Ok(databases) => {
                self.databases.insert((), databases.clone());
                databases
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to list databases");
                Vec::new()
            }
        }
    }

    pub async fn list_schemas(&mut self, database: &str) -> Vec<String> {
        let key = database.to_string();
        if let Some(hit) = self.schemas.get(&key) {
            return hit.clone();
        }
        match self.warehouse.list_schemas(database).await {
            Ok(schemas) => {
                self.schemas.insert(key, schemas.clone());
                schemas
            }
            Err(e) => {
                tracing::warn!(database, error = %e, "failed to list schemas");
                Vec::new()
            }
        }
    }

    pub async fn list_tables(&mut self, database: &str, schema: &str) -> Vec<String> {
        let key = (database.to_string(), schema.to_string());
        if let Some(hit) = self.tables.get(&key) {
            tracing::trace!(database, schema, "table list cache hit");
            return hit.clone();
        }
        match self.warehouse.list_tables(database, schema).await {
            Ok(tables) => {
                self.tables.insert(key, tables.clone());
                tables
            }
            Err(e) => {
                tracing::warn!(database, schema, error = %e, "failed to list tables");
                Vec::new()
            }
        }
    }

    /// Describe and classify the columns of one table.
    ///
    /// `None` when the warehouse errors or reports no columns for the table.
    pub async fn describe_columns(
        &mut self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> Option<TableDescriptor> {
        let key = TableRef::new(database, schema, table);
        if let Some(hit) = self.columns.get(&key) {
            tracing::trace!(table, "column cache hit");
            return Some(hit.clone());
        }

        let start = Instant::now();
        let raw = match self.warehouse.describe_columns(database, schema, table).await {
            Ok(raw) if !raw.is_empty() => raw,
            Ok(_) => {
                tracing::warn!(database, schema, table, "table has no visible columns");
                return None;
            }
            Err(e) => {
                tracing::warn!(database, schema, table, error = %e, "failed to describe table");
                return None;
            }
        };

        let mut columns = Vec::with_capacity(raw.len());
        for column in raw {
            columns.push(self.describe_column(&key, column).await);
        }
        let descriptor = TableDescriptor {
            database: database.to_string(),
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
        };
        tracing::debug!(
            table,
            columns = descriptor.columns.len(),
            ms = start.elapsed().as_millis() as u64,
            "described table"
        );
        self.columns.insert(key, descriptor.clone());
        Some(descriptor)
    }

    async fn describe_column(&self, table: &TableRef, column: ColumnSchema) -> ColumnDescriptor {
        let kind = classify(
            &column.name,
            &column.data_type,
            &self.config.categorical_keywords,
        );
        let descriptor = ColumnDescriptor::new(column.name, column.data_type, kind);
        if kind != FilterKind::Categorical {
            return descriptor;
        }
        match self.sample_values(table, &descriptor.name).await {
            Ok(samples) => descriptor.with_samples(samples),
            Err(e) => {
                tracing::warn!(
                    table = %table.table,
                    column = %descriptor.name,
                    error = %e,
                    "distinct-value probe failed, falling back to free text"
                );
                ColumnDescriptor {
                    filter_kind: FilterKind::FreeText,
                    ..descriptor
                }
            }
        }
    }

    async fn sample_values(&self, table: &TableRef, column: &str) -> Result<Vec<String>> {
        let sql = distinct_values_sql(
            &self
                .warehouse
                .dialect()
                .qualify_table(&table.database, &table.schema, &table.table),
            column,
            self.config.sample_limit,
        );
        let result = self.warehouse.execute_sql(&sql).await?;
        let mut values = result.first_column_strings();
        values.truncate(self.config.sample_limit);
        Ok(values)
    }

    /// Describe every table of a schema, keyed by table name. Tables that
    /// cannot be described are left out.
    pub async fn describe_schema(
        &mut self,
        database: &str,
        schema: &str,
    ) -> BTreeMap<String, TableDescriptor> {
        let mut described = BTreeMap::new();
        for table in self.list_tables(database, schema).await {
            if let Some(descriptor) = self.describe_columns(database, schema, &table).await {
                described.insert(table, descriptor);
            }
        }
        described
    }

    /// The whole database → schema → table tree. Databases and schemas that
    /// fail or hold nothing are left out.
    pub async fn browse(&mut self) -> CatalogTree {
        let mut tree = CatalogTree::new();
        for database in self.list_databases().await {
            let mut schemas = BTreeMap::new();
            for schema in self.list_schemas(&database).await {
                let tables = self.list_tables(&database, &schema).await;
                if !tables.is_empty() {
                    schemas.insert(schema, tables);
                }
            }
            if !schemas.is_empty() {
                tree.insert(database, schemas);
            }
        }
        tree
    }

    /// Describe the main table and every join target of `state`.
    ///
    /// Join targets live in the main table's database and schema. Targets
    /// that cannot be described are simply missing from the snapshot.
    pub async fn snapshot(&mut self, state: &QueryState) -> CatalogSnapshot {
        let mut snapshot = CatalogSnapshot::new();
        let Some(main) = state.main_table.clone() else {
            return snapshot;
        };

        let mut wanted = vec![main.clone()];
        for join in &state.joins {
            let target = join.target_table.trim();
            if target.is_empty() || wanted.iter().any(|t| t.table == target) {
                continue;
            }
            wanted.push(main.sibling(target));
        }

        for table in wanted {
            if let Some(descriptor) = self
                .describe_columns(&table.database, &table.schema, &table.table)
                .await
            {
                snapshot.insert(descriptor);
            }
        }
        snapshot
    }

    /// Drop every cached listing and description.
    pub fn reload(&mut self) {
        tracing::info!(tables = self.columns.len(), "clearing catalog cache");
        self.databases.clear();
        self.schemas.clear();
        self.tables.clear();
        self.columns.clear();
    }

    pub fn cached_descriptions(&self) -> usize {
        self.columns.len()
    }
}

/// Probe for the distinct non-null values of a column.
pub fn distinct_values_sql(qualified_table: &str, column: &str, limit: usize) -> String {
    format!(
        "SELECT DISTINCT {column} FROM {qualified_table} WHERE {column} IS NOT NULL ORDER BY {column} LIMIT {limit}"
    )
}
