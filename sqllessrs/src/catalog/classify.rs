//! Mapping from a declared column type to the filter widget it gets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Categorical,
    DateRange,
    NumericRange,
    FreeText,
}

const STRING_TYPES: &[&str] = &[
    "VARCHAR",
    "CHAR",
    "CHARACTER",
    "CHARACTER VARYING",
    "STRING",
    "TEXT",
    "NVARCHAR",
    "NCHAR",
    "BPCHAR",
];

const NUMERIC_TYPES: &[&str] = &[
    "NUMBER",
    "NUMERIC",
    "DECIMAL",
    "INT",
    "INTEGER",
    "BIGINT",
    "SMALLINT",
    "TINYINT",
    "BYTEINT",
    "HUGEINT",
    "UTINYINT",
    "USMALLINT",
    "UINTEGER",
    "UBIGINT",
    "FLOAT",
    "FLOAT4",
    "FLOAT8",
    "DOUBLE",
    "DOUBLE PRECISION",
    "REAL",
    "INT2",
    "INT4",
    "INT8",
];

/// Upper-cased base type with any `(precision, scale)` suffix removed.
fn base_type(declared_type: &str) -> String {
    let upper = declared_type.trim().to_ascii_uppercase();
    let base = match upper.find('(') {
        Some(idx) => &upper[..idx],
        None => upper.as_str(),
    };
    base.trim().to_string()
}

pub fn is_string_type(declared_type: &str) -> bool {
    STRING_TYPES.contains(&base_type(declared_type).as_str())
}

pub fn is_temporal_type(declared_type: &str) -> bool {
    let base = base_type(declared_type);
    base == "DATE" || base == "DATETIME" || base.starts_with("TIMESTAMP")
}

pub fn is_numeric_type(declared_type: &str) -> bool {
    NUMERIC_TYPES.contains(&base_type(declared_type).as_str())
}

/// Whether a string column's name suggests a small set of repeated values.
pub fn has_categorical_name(name: &str, keywords: &[String]) -> bool {
    let lower = name.to_lowercase();
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && lower.contains(&keyword.to_lowercase()))
}

/// Classify a column. Total: any type outside the known families is `FreeText`.
///
/// `Categorical` here means "probe for distinct values"; the catalog falls
/// back to `FreeText` when the probe fails.
pub fn classify(name: &str, declared_type: &str, keywords: &[String]) -> FilterKind {
    if is_string_type(declared_type) {
        if has_categorical_name(name, keywords) {
            FilterKind::Categorical
        } else {
            FilterKind::FreeText
        }
    } else if is_temporal_type(declared_type) {
        FilterKind::DateRange
    } else if is_numeric_type(declared_type) {
        FilterKind::NumericRange
    } else {
        FilterKind::FreeText
    }
}
