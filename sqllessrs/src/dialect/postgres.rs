//! PostgreSQL dialect implementation.

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    // Cross-database references are not supported; the connection already
    // pins the database.
    fn qualify_table(&self, _database: &str, schema: &str, table: &str) -> String {
        format!("{schema}.{table}")
    }

    fn json_type(&self) -> &'static str {
        "TEXT"
    }
}
