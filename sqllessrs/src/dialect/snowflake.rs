//! Snowflake dialect, the default target of the query compiler.

use super::{quote_string, Dialect};

#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeDialect;

impl Dialect for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn json_type(&self) -> &'static str {
        "VARIANT"
    }

    fn json_literal(&self, json: &str) -> String {
        format!("PARSE_JSON({})", quote_string(json))
    }

    fn json_as_text(&self, column: &str) -> String {
        format!("TO_JSON({column})")
    }
}
