use crate::catalog::CatalogSnapshot;
use crate::config::QueryConfig;
use crate::dialect::{Dialect, SnowflakeDialect};
use crate::error::Result;
use crate::query_state::QueryState;
use crate::sql_ast::SqlRenderer;

mod filters;
mod joins;
mod planner;

pub use planner::build_query;

/// Compiles a `QueryState` into query text.
///
/// The compiler trusts its input: run the validator first. Compilation is
/// pure, so the same state and snapshot always yield byte-identical text.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    row_limit_ceiling: u64,
}

impl Default for SqlBuilder {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl SqlBuilder {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            row_limit_ceiling: config.row_limit_ceiling,
        }
    }

    pub fn row_limit_ceiling(&self) -> u64 {
        self.row_limit_ceiling
    }

    /// Build Snowflake SQL.
    pub fn build(&self, state: &QueryState, snapshot: &CatalogSnapshot) -> Result<String> {
        self.build_with_dialect(state, snapshot, &SnowflakeDialect)
    }

    /// Build SQL using a provided dialect.
    pub fn build_with_dialect(
        &self,
        state: &QueryState,
        snapshot: &CatalogSnapshot,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let query = build_query(state, snapshot, self.row_limit_ceiling)?;
        let renderer = SqlRenderer::new(dialect);
        Ok(renderer.render_select(&query))
    }

    /// Like [`SqlBuilder::build_with_dialect`], but logs the failure and
    /// yields `None` so callers can skip execution.
    pub fn compile(
        &self,
        state: &QueryState,
        snapshot: &CatalogSnapshot,
        dialect: &dyn Dialect,
    ) -> Option<String> {
        match self.build_with_dialect(state, snapshot, dialect) {
            Ok(sql) => Some(sql),
            Err(e) => {
                tracing::error!(error = %e, "query compilation failed");
                None
            }
        }
    }
}
