//! One interactive query-building session.
//!
//! A [`Session`] owns the query state, the catalog cache and the last
//! execution failure. Edits arrive as [`Command`]s; every read goes through
//! [`Session::preview`] or [`Session::execute`], which rebuild their output
//! from scratch so the same state always renders the same way.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backends::WarehouseConnection;
use crate::catalog::{Catalog, CatalogSnapshot};
use crate::config::ResolvedDatasourceConfig;
use crate::error::Result;
use crate::executor::QueryResult;
use crate::query_builder::SqlBuilder;
use crate::query_state::{
    AggregationSpec, ConditionKind, FilterValue, JoinSpec, QueryState, TableRef,
};
use crate::runtime::{run_sql, timeout_from_millis};
use crate::store::{QueryStore, SavedQuery};
use crate::validation::{ValidationIssue, ValidationReport, Validator};

/// Named edits to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectTable {
        database: String,
        schema: String,
        table: String,
    },
    AddFilter {
        column: String,
        kind: ConditionKind,
    },
    UpdateFilter {
        index: usize,
        value: FilterValue,
    },
    RemoveFilter {
        index: usize,
    },
    AddJoin(JoinSpec),
    UpdateJoin {
        index: usize,
        spec: JoinSpec,
    },
    RemoveJoin {
        index: usize,
    },
    UpdateAggregation(AggregationSpec),
    Reset,
    ReloadCatalog,
    DismissError,
}

/// The last query the warehouse rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub message: String,
    pub sql: String,
}

/// Validation result plus the text that would run; `sql` is `None` while
/// there are errors or when compilation fails.
#[derive(Debug, Clone)]
pub struct Preview {
    pub report: ValidationReport,
    pub sql: Option<String>,
}

#[derive(Debug)]
pub enum ExecutionOutcome {
    Completed {
        sql: String,
        result: QueryResult,
        elapsed: Duration,
        warnings: Vec<ValidationIssue>,
    },
    /// Validation errors; nothing was compiled or sent.
    Rejected { report: ValidationReport },
    CompileFailed { message: String },
    /// The warehouse refused the query.
    Failed { sql: String, error: String },
}

pub struct Session {
    state: QueryState,
    catalog: Catalog,
    builder: SqlBuilder,
    validator: Validator,
    timeout: Option<Duration>,
    default_row_limit: u64,
    last_error: Option<ExecutionFailure>,
}

impl Session {
    pub fn new(warehouse: Arc<dyn WarehouseConnection>) -> Self {
        Self::with_config(warehouse, &ResolvedDatasourceConfig::default())
    }

    pub fn with_config(
        warehouse: Arc<dyn WarehouseConnection>,
        config: &ResolvedDatasourceConfig,
    ) -> Self {
        let mut state = QueryState::new();
        state.aggregation.row_limit = Some(config.query.default_row_limit);
        Self {
            state,
            catalog: Catalog::with_config(warehouse, config.catalog.clone()),
            builder: SqlBuilder::new(&config.query),
            validator: Validator::new(config.validation.warn_only),
            timeout: timeout_from_millis(config.query.timeout_ms),
            default_row_limit: config.query.default_row_limit,
            last_error: None,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn last_error(&self) -> Option<&ExecutionFailure> {
        self.last_error.as_ref()
    }

    /// Apply one edit. Returns `false` when the edit referenced a filter or
    /// join that does not exist; the state is then unchanged.
    pub fn apply(&mut self, command: Command) -> bool {
        tracing::debug!(command = ?command, "applying command");
        match command {
            Command::SelectTable {
                database,
                schema,
                table,
            } => {
                self.state
                    .set_main_table(TableRef::new(database, schema, table));
                true
            }
            Command::AddFilter { column, kind } => {
                self.state.add_filter(column, kind);
                true
            }
            Command::UpdateFilter { index, value } => self.state.update_filter(index, value),
            Command::RemoveFilter { index } => self.state.remove_filter(index).is_some(),
            Command::AddJoin(spec) => {
                self.state.add_join(spec);
                true
            }
            Command::UpdateJoin { index, spec } => self.state.update_join(index, spec),
            Command::RemoveJoin { index } => self.state.remove_join(index).is_some(),
            Command::UpdateAggregation(spec) => {
                self.state.update_aggregation(spec);
                true
            }
            Command::Reset => {
                self.state.reset();
                self.state.aggregation.row_limit = Some(self.default_row_limit);
                self.last_error = None;
                true
            }
            Command::ReloadCatalog => {
                self.catalog.reload();
                true
            }
            Command::DismissError => self.last_error.take().is_some(),
        }
    }

    async fn snapshot(&mut self) -> CatalogSnapshot {
        self.catalog.snapshot(&self.state).await
    }

    pub async fn preview(&mut self) -> Preview {
        let snapshot = self.snapshot().await;
        let report = self.validator.validate(&self.state, &snapshot);
        let sql = if report.is_clean() {
            let dialect = self.catalog.warehouse().dialect();
            self.builder.compile(&self.state, &snapshot, dialect)
        } else {
            None
        };
        Preview { report, sql }
    }

    /// Validate, compile and run the current state.
    ///
    /// A warehouse failure is kept as [`Session::last_error`] until it is
    /// dismissed or a later run succeeds.
    pub async fn execute(&mut self) -> ExecutionOutcome {
        let snapshot = self.snapshot().await;
        let report = self.validator.validate(&self.state, &snapshot);
        if !report.is_clean() {
            tracing::info!(errors = report.errors.len(), "query rejected by validation");
            return ExecutionOutcome::Rejected { report };
        }

        let dialect = self.catalog.warehouse().dialect();
        let sql = match self.builder.build_with_dialect(&self.state, &snapshot, dialect) {
            Ok(sql) => sql,
            Err(e) => {
                tracing::error!(error = %e, "query compilation failed");
                return ExecutionOutcome::CompileFailed {
                    message: e.to_string(),
                };
            }
        };

        let start = Instant::now();
        let warehouse = self.catalog.warehouse().clone();
        match run_sql(warehouse.as_ref(), &sql, self.timeout).await {
            Ok(result) => {
                let elapsed = start.elapsed();
                tracing::info!(
                    rows = result.row_count(),
                    ms = elapsed.as_millis() as u64,
                    "query executed"
                );
                self.last_error = None;
                ExecutionOutcome::Completed {
                    sql,
                    result,
                    elapsed,
                    warnings: report.warnings,
                }
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(error = %error, "query execution failed");
                self.last_error = Some(ExecutionFailure {
                    message: error.clone(),
                    sql: sql.clone(),
                });
                ExecutionOutcome::Failed { sql, error }
            }
        }
    }

    /// Save the current state under `name`.
    pub async fn save_to(
        &self,
        store: &mut dyn QueryStore,
        name: &str,
        description: &str,
        tags: &[String],
    ) -> Result<()> {
        let saved = SavedQuery::from_state(&self.state)?
            .with_description(description)
            .with_tags(tags.iter().cloned());
        store.save(name, &saved).await
    }

    /// Replace the current state with the query saved under `name`.
    /// Returns `false` when there is no such query.
    pub async fn load_from(&mut self, store: &dyn QueryStore, name: &str) -> Result<bool> {
        match store.load(name).await? {
            Some(saved) => {
                self.state = saved.to_state();
                tracing::info!(name, "loaded saved query");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
