//! Turns a `QueryState` into a `SelectQuery`.
//!
//! Clause order is fixed: projection, source, joins, predicates, grouping,
//! ordering, limit.

use crate::catalog::CatalogSnapshot;
use crate::error::{Result, SqllessError};
use crate::query_state::QueryState;
use crate::sql_ast::{Aggregation, OrderItem, SelectItem, SelectQuery, SqlExpr};

use super::filters::render_filter_exprs;
use super::joins::{build_joins, source_ref};

pub fn build_query(
    state: &QueryState,
    snapshot: &CatalogSnapshot,
    row_limit_ceiling: u64,
) -> Result<SelectQuery> {
    let main = state
        .main_table
        .as_ref()
        .ok_or_else(|| SqllessError::Sql("no main table selected".to_string()))?;

    let mut query = SelectQuery {
        select: build_projection(state, snapshot),
        from: source_ref(main),
        joins: build_joins(main, &state.joins),
        ..SelectQuery::default()
    };

    for filter in &state.filters {
        query.filters.extend(render_filter_exprs(filter)?);
    }

    query.group_by = state
        .aggregation
        .group_by_columns
        .iter()
        .map(|c| column(c))
        .collect();

    if let Some(sort) = state
        .aggregation
        .sort_column
        .as_deref()
        .filter(|c| !c.is_empty())
    {
        query.order_by.push(OrderItem {
            expr: column(sort),
            direction: state.aggregation.sort_direction,
        });
    }

    // Limits at or above the ceiling mean "everything", not "cap at the ceiling".
    query.limit = state
        .aggregation
        .row_limit
        .filter(|n| *n > 0 && *n < row_limit_ceiling);

    Ok(query)
}

/// Group-by columns, a row count and one total per numeric main-table
/// column; `*` when nothing is grouped.
fn build_projection(state: &QueryState, snapshot: &CatalogSnapshot) -> Vec<SelectItem> {
    let group_by = &state.aggregation.group_by_columns;
    if group_by.is_empty() {
        return vec![SelectItem::new(SqlExpr::Star)];
    }

    let mut select: Vec<SelectItem> = group_by.iter().map(|c| SelectItem::new(column(c))).collect();
    select.push(SelectItem::aliased(
        SqlExpr::Aggregate {
            agg: Aggregation::Count,
            expr: Box::new(SqlExpr::Star),
        },
        "record_count",
    ));

    let main_table = state.main_table.as_ref().map(|t| t.table.as_str());
    match main_table.and_then(|t| snapshot.table(t)) {
        Some(descriptor) => {
            for numeric in descriptor.numeric_columns() {
                select.push(SelectItem::aliased(
                    SqlExpr::Aggregate {
                        agg: Aggregation::Sum,
                        expr: Box::new(column(&numeric.name)),
                    },
                    format!("{}_total", numeric.name),
                ));
            }
        }
        None => tracing::warn!(
            table = main_table.unwrap_or_default(),
            "main table not described, projecting counts only"
        ),
    }
    select
}

fn column(name: &str) -> SqlExpr {
    SqlExpr::Column {
        table: None,
        name: name.to_string(),
    }
}
