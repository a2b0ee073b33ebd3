use crate::query_state::{JoinSpec, JoinType, TableRef};
use crate::sql_ast::{Join, SourceRef, SqlBinaryOperator, SqlExpr, SqlJoinType};

/// Every join is rendered, in the order it was added; none are pruned.
pub(crate) fn build_joins(main: &TableRef, joins: &[JoinSpec]) -> Vec<Join> {
    joins.iter().map(|join| build_join(main, join)).collect()
}

fn build_join(main: &TableRef, join: &JoinSpec) -> Join {
    let join_type = match join.join_type {
        JoinType::Inner => SqlJoinType::Inner,
        JoinType::Left => SqlJoinType::Left,
        JoinType::Right => SqlJoinType::Right,
        JoinType::FullOuter => SqlJoinType::Full,
    };
    let target = join.target_table.trim();
    Join {
        join_type,
        table: source_ref(&main.sibling(target)),
        on: SqlExpr::BinaryOp {
            op: SqlBinaryOperator::Eq,
            left: Box::new(SqlExpr::Column {
                table: Some(main.table.clone()),
                name: join.left_column.trim().to_string(),
            }),
            right: Box::new(SqlExpr::Column {
                table: Some(target.to_string()),
                name: join.right_column.trim().to_string(),
            }),
        },
    }
}

pub(crate) fn source_ref(table: &TableRef) -> SourceRef {
    SourceRef {
        database: table.database.clone(),
        schema: table.schema.clone(),
        table: table.table.clone(),
    }
}
