//! DuckDB dialect implementation.

use super::Dialect;

/// DuckDB resolves `catalog.schema.table`, where the catalog is the attached
/// database file name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }
}
