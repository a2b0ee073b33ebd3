//! Named, persisted query states.
//!
//! A [`SavedQuery`] is the JSON document a query state is saved as. Stores
//! only know how to put, fetch, list and drop those documents by name.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Result, SqllessError};
use crate::query_state::{AggregationSpec, FilterSpec, JoinSpec, QueryState, TableRef};

mod file;
mod warehouse;

pub use file::FileQueryStore;
pub use warehouse::WarehouseQueryStore;

/// Serialized form of a `QueryState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub db: String,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub conditions: AggregationSpec,
    #[serde(default)]
    pub join_conditions: Vec<JoinSpec>,
    #[serde(default)]
    pub filter_conditions: Vec<FilterSpec>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SavedQuery {
    /// Fails when no main table is selected; there is nothing to restore it onto.
    pub fn from_state(state: &QueryState) -> Result<Self> {
        let main = state
            .main_table
            .as_ref()
            .ok_or_else(|| SqllessError::Store("cannot save a query without a main table".into()))?;
        Ok(Self {
            db: main.database.clone(),
            schema: main.schema.clone(),
            table: main.table.clone(),
            conditions: state.aggregation.clone(),
            join_conditions: state.joins.clone(),
            filter_conditions: state.filters.clone(),
            description: String::new(),
            tags: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_state(&self) -> QueryState {
        QueryState {
            main_table: Some(TableRef::new(&self.db, &self.schema, &self.table)),
            joins: self.join_conditions.clone(),
            filters: self.filter_conditions.clone(),
            aggregation: self.conditions.clone(),
        }
    }
}

#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Insert or replace the query saved under `name`.
    async fn save(&mut self, name: &str, query: &SavedQuery) -> Result<()>;
    async fn load(&self, name: &str) -> Result<Option<SavedQuery>>;
    /// Saved names in ascending order.
    async fn list(&self) -> Result<Vec<String>>;
    /// Deleting an unknown name is not an error.
    async fn delete(&mut self, name: &str) -> Result<()>;
}

/// Store that lives as long as the value does.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryStore {
    entries: BTreeMap<String, SavedQuery>,
}

impl MemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl QueryStore for MemoryQueryStore {
    async fn save(&mut self, name: &str, query: &SavedQuery) -> Result<()> {
        self.entries.insert(name.to_string(), query.clone());
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<Option<SavedQuery>> {
        Ok(self.entries.get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }

    async fn delete(&mut self, name: &str) -> Result<()> {
        self.entries.remove(name);
        Ok(())
    }
}

/// Short stable identifier for a warehouse user and role.
pub fn user_context(user: &str, role: &str) -> String {
    let digest = Sha256::digest(format!("{user}_{role}").as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(16);
    hex
}

/// Every saved query as `{name: query}`, each stamped with `exported_at`.
pub async fn export_bundle(store: &dyn QueryStore) -> Result<Value> {
    let exported_at = chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let mut bundle = serde_json::Map::new();
    for name in store.list().await? {
        let Some(query) = store.load(&name).await? else {
            continue;
        };
        let mut entry = serde_json::to_value(&query)?;
        if let Value::Object(fields) = &mut entry {
            fields.insert("exported_at".to_string(), Value::String(exported_at.clone()));
        }
        bundle.insert(name, entry);
    }
    tracing::info!(queries = bundle.len(), "exported saved queries");
    Ok(Value::Object(bundle))
}

/// Save every entry of a bundle produced by [`export_bundle`]. Entries
/// without a `db` field or that do not parse are skipped. Returns the
/// number of queries imported.
pub async fn import_bundle(store: &mut dyn QueryStore, bundle: &Value) -> Result<usize> {
    let entries = bundle
        .as_object()
        .ok_or_else(|| SqllessError::Store("import bundle must be a JSON object".into()))?;
    let mut imported = 0;
    for (name, entry) in entries {
        if entry.get("db").is_none() {
            tracing::debug!(name = %name, "skipping bundle entry without db");
            continue;
        }
        match serde_json::from_value::<SavedQuery>(entry.clone()) {
            Ok(query) => {
                store.save(name, &query).await?;
                imported += 1;
            }
            Err(e) => tracing::warn!(name = %name, error = %e, "skipping unreadable bundle entry"),
        }
    }
    tracing::info!(imported, "imported saved queries");
    Ok(imported)
}
