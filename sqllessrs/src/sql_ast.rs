use chrono::NaiveDate;
use serde_json::Value;

use crate::dialect::{escape_string, Dialect};
use crate::query_state::SortDirection;

#[derive(Debug, Clone)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    Star,
    Literal(Value),
    Date(NaiveDate),
    /// Text emitted exactly as given.
    Raw(String),
    /// Parenthesized sub-expression.
    Nested(Box<SqlExpr>),
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
    },
    Like {
        expr: Box<SqlExpr>,
        pattern: LikePattern,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum SqlBinaryOperator {
    Eq,
    Gte,
    Lte,
}

#[derive(Debug, Clone, Copy)]
pub enum Aggregation {
    Count,
    Sum,
}

/// Literal text matched by `LIKE`, anchored the way the pattern says.
#[derive(Debug, Clone)]
pub struct LikePattern {
    pub text: String,
    pub leading_wildcard: bool,
    pub trailing_wildcard: bool,
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: SqlExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: SqlExpr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// A table in FROM or JOIN position.
#[derive(Debug, Clone, Default)]
pub struct SourceRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

#[derive(Debug, Clone, Copy)]
pub enum SqlJoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub join_type: SqlJoinType,
    pub table: SourceRef,
    pub on: SqlExpr,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: SourceRef,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

/// Renders a [`SelectQuery`] one clause per line.
///
/// Join conditions sit on their own line indented by two spaces, and
/// predicates after the first continue as `  AND ...` lines.
pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {alias}"),
                    None => expr_sql,
                }
            })
            .collect();

        let mut lines = vec![
            format!("SELECT {}", select_items.join(", ")),
            format!("FROM {}", self.render_source(&query.from)),
        ];

        for join in &query.joins {
            let join_kw = match join.join_type {
                SqlJoinType::Inner => "INNER JOIN",
                SqlJoinType::Left => "LEFT JOIN",
                SqlJoinType::Right => "RIGHT JOIN",
                SqlJoinType::Full => "FULL OUTER JOIN",
            };
            lines.push(format!("{join_kw} {}", self.render_source(&join.table)));
            lines.push(format!("  ON {}", self.render_expr(&join.on)));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            lines.push(format!("WHERE {}", filters.join("\n  AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query.group_by.iter().map(|g| self.render_expr(g)).collect();
            lines.push(format!("GROUP BY {}", groups.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} {}", self.render_expr(&o.expr), o.direction.keyword()))
                .collect();
            lines.push(format!("ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            lines.push(format!("LIMIT {limit}"));
        }

        lines.join("\n")
    }

    fn render_source(&self, source: &SourceRef) -> String {
        self.dialect
            .qualify_table(&source.database, &source.schema, &source.table)
    }

    fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!("{t}.{name}"),
                None => name.clone(),
            },
            SqlExpr::Star => "*".to_string(),
            SqlExpr::Literal(v) => self.dialect.render_literal(v),
            SqlExpr::Date(d) => self.dialect.render_date(d),
            SqlExpr::Raw(text) => text.clone(),
            SqlExpr::Nested(inner) => format!("({})", self.render_expr(inner)),
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Eq => "=",
                    SqlBinaryOperator::Gte => ">=",
                    SqlBinaryOperator::Lte => "<=",
                };
                format!(
                    "{} {} {}",
                    self.render_expr(left),
                    op_sql,
                    self.render_expr(right)
                )
            }
            SqlExpr::Aggregate { agg, expr } => {
                let func = match agg {
                    Aggregation::Count => "COUNT",
                    Aggregation::Sum => "SUM",
                };
                format!("{func}({})", self.render_expr(expr))
            }
            SqlExpr::InList { expr, list } => {
                let rendered_values: Vec<String> =
                    list.iter().map(|v| self.render_expr(v)).collect();
                format!(
                    "{} IN ({})",
                    self.render_expr(expr),
                    rendered_values.join(", ")
                )
            }
            SqlExpr::Like { expr, pattern } => {
                let lead = if pattern.leading_wildcard { "%" } else { "" };
                let trail = if pattern.trailing_wildcard { "%" } else { "" };
                format!(
                    "{} LIKE '{lead}{}{trail}'",
                    self.render_expr(expr),
                    escape_string(&pattern.text)
                )
            }
        }
    }
}
