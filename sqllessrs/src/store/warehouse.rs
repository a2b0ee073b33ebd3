use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::backends::WarehouseConnection;
use crate::config::StoreConfig;
use crate::dialect::quote_string;
use crate::error::{Result, SqllessError};
use crate::executor::QueryResult;

use super::{user_context, QueryStore, SavedQuery};

const FALLBACK_USER_CONTEXT: &str = "default_user";

/// Saved queries kept in a warehouse table, partitioned by user context.
///
/// Rows are never deleted. Saving deactivates the previous version of a
/// name before inserting the new one, and deleting deactivates every
/// version.
pub struct WarehouseQueryStore {
    warehouse: Arc<dyn WarehouseConnection>,
    table: String,
    user_context: String,
}

impl WarehouseQueryStore {
    pub fn new(
        warehouse: Arc<dyn WarehouseConnection>,
        config: &StoreConfig,
        user_context: impl Into<String>,
    ) -> Self {
        Self {
            warehouse,
            table: config.table_name.clone(),
            user_context: user_context.into(),
        }
    }

    /// Key the store by the connected user and role, or by a shared
    /// fallback context when the warehouse cannot say who is connected.
    pub async fn for_current_user(
        warehouse: Arc<dyn WarehouseConnection>,
        config: &StoreConfig,
    ) -> Self {
        let context = match warehouse
            .execute_sql("SELECT CURRENT_USER() AS user_name, CURRENT_ROLE() AS user_role")
            .await
        {
            Ok(result) => context_from_identity(&result).unwrap_or_else(|| {
                tracing::warn!("warehouse returned no identity, using shared context");
                FALLBACK_USER_CONTEXT.to_string()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read warehouse identity, using shared context");
                FALLBACK_USER_CONTEXT.to_string()
            }
        };
        Self::new(warehouse, config, context)
    }

    pub fn user_context(&self) -> &str {
        &self.user_context
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn ensure_table(&self) -> Result<()> {
        let json = self.warehouse.dialect().json_type();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n  \
             config_id VARCHAR PRIMARY KEY,\n  \
             config_name VARCHAR NOT NULL,\n  \
             user_context VARCHAR NOT NULL,\n  \
             config_data {json} NOT NULL,\n  \
             description VARCHAR,\n  \
             tags {json},\n  \
             created_at TIMESTAMP,\n  \
             updated_at TIMESTAMP,\n  \
             last_used TIMESTAMP,\n  \
             is_active BOOLEAN DEFAULT TRUE,\n  \
             version INTEGER DEFAULT 1\n)",
            table = self.table,
        );
        self.run(&sql).await?;
        tracing::info!(table = %self.table, "query store table ready");
        Ok(())
    }

    /// Record that `name` was just used.
    pub async fn touch(&self, name: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {table} SET last_used = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP \
             WHERE {scope} AND is_active = TRUE",
            table = self.table,
            scope = self.name_scope(name),
        );
        self.run(&sql).await.map(|_| ())
    }

    fn user_scope(&self) -> String {
        format!("user_context = {}", quote_string(&self.user_context))
    }

    fn name_scope(&self, name: &str) -> String {
        format!(
            "{} AND config_name = {}",
            self.user_scope(),
            quote_string(name)
        )
    }

    async fn run(&self, sql: &str) -> Result<QueryResult> {
        tracing::trace!(sql = %sql, "query store statement");
        self.warehouse
            .execute_sql(sql)
            .await
            .map_err(|e| SqllessError::Store(format!("{} on {}: {e}", first_word(sql), self.table)))
    }
}

#[async_trait]
impl QueryStore for WarehouseQueryStore {
    async fn save(&mut self, name: &str, query: &SavedQuery) -> Result<()> {
        let dialect = self.warehouse.dialect();
        let config_json = serde_json::to_string(query)?;
        let tags_json = serde_json::to_string(&query.tags)?;
        let config_id = format!(
            "{}_{}_{}",
            self.user_context,
            name,
            chrono::Utc::now().timestamp_micros()
        );

        let deactivate = format!(
            "UPDATE {table} SET is_active = FALSE, updated_at = CURRENT_TIMESTAMP WHERE {scope}",
            table = self.table,
            scope = self.name_scope(name),
        );
        let insert = format!(
            "INSERT INTO {table} \
             (config_id, config_name, user_context, config_data, description, tags, \
             created_at, updated_at, last_used, is_active, version)\n\
             SELECT {id}, {name}, {ctx}, {data}, {description}, {tags}, \
             CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, TRUE, \
             COALESCE((SELECT MAX(version) FROM {table} WHERE {scope}), 0) + 1",
            table = self.table,
            id = quote_string(&config_id),
            name = quote_string(name),
            ctx = quote_string(&self.user_context),
            data = dialect.json_literal(&config_json),
            description = quote_string(&query.description),
            tags = dialect.json_literal(&tags_json),
            scope = self.name_scope(name),
        );

        self.run(&deactivate).await?;
        self.run(&insert).await?;
        tracing::info!(name, user_context = %self.user_context, "saved query");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<SavedQuery>> {
        let sql = format!(
            "SELECT {data} AS config_data FROM {table} \
             WHERE {scope} AND is_active = TRUE \
             ORDER BY version DESC LIMIT 1",
            data = self.warehouse.dialect().json_as_text("config_data"),
            table = self.table,
            scope = self.name_scope(name),
        );
        let result = self.run(&sql).await?;
        let Some(cell) = result
            .rows
            .first()
            .and_then(|row| QueryResult::cell(row, "config_data"))
        else {
            return Ok(None);
        };
        let query: SavedQuery = match cell {
            Value::String(text) => serde_json::from_str(text)?,
            other => serde_json::from_value(other.clone())?,
        };
        if let Err(e) = self.touch(name).await {
            tracing::warn!(name, error = %e, "failed to update last_used");
        }
        Ok(Some(query))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT config_name FROM {table} \
             WHERE {scope} AND is_active = TRUE ORDER BY config_name",
            table = self.table,
            scope = self.user_scope(),
        );
        Ok(self.run(&sql).await?.column_strings("config_name"))
    }

    async fn delete(&mut self, name: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {table} SET is_active = FALSE, updated_at = CURRENT_TIMESTAMP WHERE {scope}",
            table = self.table,
            scope = self.name_scope(name),
        );
        self.run(&sql).await?;
        tracing::info!(name, user_context = %self.user_context, "deleted saved query");
        Ok(())
    }
}

fn context_from_identity(result: &QueryResult) -> Option<String> {
    let row = result.rows.first()?;
    let user = QueryResult::cell(row, "user_name").and_then(crate::executor::value_to_text)?;
    let role = QueryResult::cell(row, "user_role")
        .and_then(crate::executor::value_to_text)
        .unwrap_or_default();
    Some(user_context(&user, &role))
}

fn first_word(sql: &str) -> &str {
    sql.split_whitespace().next().unwrap_or("statement")
}
