use serde_json::Value;

use crate::error::{Result, SqllessError};
use crate::query_state::{FilterSpec, FilterValue, MatchType, RangeBounds};
use crate::sql_ast::{LikePattern, SqlBinaryOperator, SqlExpr};

/// Predicates for one filter. An empty list means the filter is still unset.
///
/// Only a custom expression renders without a column.
pub(crate) fn render_filter_exprs(filter: &FilterSpec) -> Result<Vec<SqlExpr>> {
    let name = filter.column.trim();
    if name.is_empty() && !matches!(filter.condition, FilterValue::Custom { .. }) {
        return Ok(Vec::new());
    }
    let column = || SqlExpr::Column {
        table: None,
        name: name.to_string(),
    };
    let mut out = Vec::new();
    match &filter.condition {
        FilterValue::ValueSet { values } => {
            if !values.is_empty() {
                out.push(SqlExpr::InList {
                    expr: Box::new(column()),
                    list: values
                        .iter()
                        .map(|v| SqlExpr::Literal(Value::String(v.clone())))
                        .collect(),
                });
            }
        }
        FilterValue::Range {
            bounds: RangeBounds::Date { from, to },
        } => {
            if let Some(from) = from {
                out.push(compare(column(), SqlBinaryOperator::Gte, SqlExpr::Date(*from)));
            }
            if let Some(to) = to {
                out.push(compare(column(), SqlBinaryOperator::Lte, SqlExpr::Date(*to)));
            }
        }
        FilterValue::Range {
            bounds: RangeBounds::Numeric { min, max },
        } => {
            // Zero doubles as "unset" for either bound.
            if *min != 0.0 {
                out.push(compare(column(), SqlBinaryOperator::Gte, number(name, *min)?));
            }
            if *max != 0.0 {
                out.push(compare(column(), SqlBinaryOperator::Lte, number(name, *max)?));
            }
        }
        FilterValue::Pattern { match_type, value } => {
            if !value.is_empty() {
                out.push(SqlExpr::Like {
                    expr: Box::new(column()),
                    pattern: LikePattern {
                        text: value.clone(),
                        leading_wildcard: !matches!(match_type, MatchType::Prefix),
                        trailing_wildcard: !matches!(match_type, MatchType::Suffix),
                    },
                });
            }
        }
        FilterValue::Custom { raw_expression } => {
            if !raw_expression.trim().is_empty() {
                out.push(SqlExpr::Nested(Box::new(SqlExpr::Raw(raw_expression.clone()))));
            }
        }
    }
    Ok(out)
}

fn compare(left: SqlExpr, op: SqlBinaryOperator, right: SqlExpr) -> SqlExpr {
    SqlExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn number(column: &str, value: f64) -> Result<SqlExpr> {
    serde_json::Number::from_f64(value)
        .map(|n| SqlExpr::Literal(Value::Number(n)))
        .ok_or_else(|| {
            SqllessError::Sql(format!("range bound {value} on column {column} is not a finite number"))
        })
}
