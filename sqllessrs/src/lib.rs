//! Catalog-driven query assembly and validation.
//!
//! A [`Session`] holds one in-progress [`QueryState`]. The [`Catalog`]
//! describes the tables it touches, the [`Validator`] checks it against that
//! description, and the [`SqlBuilder`] renders it as SQL for the warehouse.

pub mod backends;
pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod logging;
pub mod query_builder;
pub mod query_state;
pub mod runtime;
pub mod schema_cache;
pub mod session;
pub mod sql_ast;
pub mod store;
pub mod validation;

pub use backends::{ColumnSchema, ConnectionManager, WarehouseConnection};
#[cfg(feature = "duckdb")]
pub use backends::DuckDbConnection;
#[cfg(feature = "postgres")]
pub use backends::PostgresConnection;
pub use catalog::{Catalog, CatalogSnapshot, ColumnDescriptor, FilterKind, TableDescriptor};
pub use config::SqllessConfig;
pub use error::{Result, SqllessError};
pub use executor::QueryResult;
pub use query_builder::SqlBuilder;
pub use query_state::{
    AggregationSpec, ConditionKind, FilterSpec, FilterValue, JoinSpec, JoinType, MatchType,
    QueryState, RangeBounds, SortDirection, TableRef,
};
pub use session::{Command, ExecutionFailure, ExecutionOutcome, Preview, Session};
pub use store::{FileQueryStore, MemoryQueryStore, QueryStore, SavedQuery, WarehouseQueryStore};
pub use validation::{IssueScope, ValidationIssue, ValidationReport, Validator};
