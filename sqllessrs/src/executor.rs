#[cfg(feature = "duckdb")]
use duckdb::types::Value as DuckValue;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
}

/// Rows returned by the warehouse, one JSON object per row keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Look up a cell by column name, ignoring ASCII case.
    ///
    /// Warehouses disagree on the case of unquoted result columns
    /// (Snowflake upper-cases, DuckDB and Postgres keep/lower-case).
    pub fn cell<'a>(row: &'a Map<String, Value>, column: &str) -> Option<&'a Value> {
        row.get(column).or_else(|| {
            row.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    /// Non-null values of one column rendered as text, in row order.
    pub fn column_strings(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| Self::cell(row, column))
            .filter_map(value_to_text)
            .collect()
    }

    /// Text of the first column of every row; used for catalog listings.
    pub fn first_column_strings(&self) -> Vec<String> {
        match self.columns.first() {
            Some(col) => self.column_strings(&col.name),
            None => Vec::new(),
        }
    }
}

/// Render a scalar JSON value as display text; `None` for SQL NULL.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(feature = "duckdb")]
pub(crate) fn duck_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        DuckValue::HugeInt(i) => Value::String(i.to_string()),
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Decimal(d) => Value::String(d.to_string()),
        DuckValue::Timestamp(unit, t) => {
            let micros = unit.to_micros(t);
            match chrono::DateTime::from_timestamp_micros(micros) {
                Some(ts) => Value::String(ts.naive_utc().to_string()),
                None => Value::String(format!("{t} ({unit:?})")),
            }
        }
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(bytes) => Value::String(hex::encode(bytes)),
        // Days since the Unix epoch; 719_163 is the day number of 1970-01-01 from CE.
        DuckValue::Date32(d) => match chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163) {
            Some(date) => Value::String(date.to_string()),
            None => Value::from(d),
        },
        DuckValue::Time64(unit, t) => Value::String(format!("{t} ({unit:?})")),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => Value::String(format!("{months} months {days} days {nanos} nanos")),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(duck_value_to_json).collect())
        }
        DuckValue::Enum(s) => Value::String(s),
        DuckValue::Struct(fields) => {
            let mut map = Map::new();
            for (key, val) in fields.iter() {
                map.insert(key.clone(), duck_value_to_json(val.clone()));
            }
            Value::Object(map)
        }
        DuckValue::Map(entries) => Value::Array(
            entries
                .iter()
                .map(|(k, v)| {
                    Value::Array(vec![
                        duck_value_to_json(k.clone()),
                        duck_value_to_json(v.clone()),
                    ])
                })
                .collect(),
        ),
        DuckValue::Union(inner) => duck_value_to_json(*inner),
    }
}
