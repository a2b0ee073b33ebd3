use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::classify::FilterKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub filter_kind: FilterKind,
    /// Distinct values offered for a categorical column; `None` for every other kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<String>>,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        filter_kind: FilterKind,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            filter_kind,
            sample_values: None,
        }
    }

    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.sample_values = Some(samples);
        self
    }
}

/// A described table. Columns keep the warehouse's ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns offered a numeric range filter, in catalog order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.filter_kind == FilterKind::NumericRange)
    }
}

/// Immutable view of the tables one query touches, keyed by table name.
///
/// A table absent from the snapshot could not be described.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    tables: BTreeMap<String, TableDescriptor>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, descriptor: TableDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    pub fn insert(&mut self, descriptor: TableDescriptor) {
        self.tables.insert(descriptor.table.clone(), descriptor);
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
