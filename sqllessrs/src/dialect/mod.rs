//! SQL dialect abstractions for different warehouses.
//!
//! Identifiers are emitted the way they were picked from the catalog, so a
//! dialect only decides how tables are qualified and how literals are spelled.

use chrono::NaiveDate;
use serde_json::Value;

pub trait Dialect {
    fn name(&self) -> &'static str;

    /// Fully qualified reference to a table.
    fn qualify_table(&self, database: &str, schema: &str, table: &str) -> String {
        format!("{database}.{schema}.{table}")
    }

    fn render_date(&self, date: &NaiveDate) -> String {
        format!("'{}'", date.format("%Y-%m-%d"))
    }

    /// Column type for stored JSON documents.
    fn json_type(&self) -> &'static str {
        "VARCHAR"
    }

    /// Expression that stores `json` in a [`Dialect::json_type`] column.
    fn json_literal(&self, json: &str) -> String {
        quote_string(json)
    }

    /// Expression that reads a [`Dialect::json_type`] column back as text.
    fn json_as_text(&self, column: &str) -> String {
        column.to_string()
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string().to_uppercase(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote_string(s),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| self.render_literal(v)).collect();
                rendered.join(", ")
            }
            Value::Object(_) => quote_string(&value.to_string()),
        }
    }
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

/// Double embedded single quotes without adding the surrounding quotes.
pub fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

mod duckdb;
mod postgres;
mod snowflake;

pub use duckdb::DuckDbDialect;
pub use postgres::PostgresDialect;
pub use snowflake::SnowflakeDialect;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_quote_doubled() {
        assert_eq!(quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(escape_string("it's"), "it''s");
    }

    #[test]
    fn literals_render_per_json_type() {
        let d = SnowflakeDialect;
        assert_eq!(d.render_literal(&json!(null)), "NULL");
        assert_eq!(d.render_literal(&json!(true)), "TRUE");
        assert_eq!(d.render_literal(&json!(10)), "10");
        assert_eq!(d.render_literal(&json!(2.5)), "2.5");
        assert_eq!(d.render_literal(&json!(["a", "b'c"])), "'a', 'b''c'");
    }

    #[test]
    fn postgres_drops_database_from_table_refs() {
        assert_eq!(
            SnowflakeDialect.qualify_table("DB", "PUBLIC", "ORDERS"),
            "DB.PUBLIC.ORDERS"
        );
        assert_eq!(
            PostgresDialect.qualify_table("db", "public", "orders"),
            "public.orders"
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(DuckDbDialect.render_date(&date), "'2024-01-31'");
    }

    #[test]
    fn json_storage_per_dialect() {
        assert_eq!(
            SnowflakeDialect.json_literal(r#"{"a":"it's"}"#),
            r#"PARSE_JSON('{"a":"it''s"}')"#
        );
        assert_eq!(SnowflakeDialect.json_type(), "VARIANT");
        assert_eq!(DuckDbDialect.json_literal("[]"), "'[]'");
        assert_eq!(PostgresDialect.json_as_text("config_data"), "config_data");
    }
}
