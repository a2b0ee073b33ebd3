mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeWarehouse, DB, SCHEMA};
use sqlless::config::SqllessConfig;
use sqlless::{
    AggregationSpec, Command, ConditionKind, ConnectionManager, ExecutionOutcome, FilterValue,
    IssueScope, JoinSpec, JoinType, MemoryQueryStore, QueryStore, Session,
};

fn select_orders() -> Command {
    Command::SelectTable {
        database: DB.into(),
        schema: SCHEMA.into(),
        table: "ORDERS".into(),
    }
}

#[tokio::test]
async fn preview_renders_validated_sql() {
    let warehouse = Arc::new(FakeWarehouse::shop());
    let mut session = Session::new(warehouse.clone());

    assert!(session.apply(select_orders()));
    assert!(session.apply(Command::AddFilter {
        column: "ORDER_STATUS".into(),
        kind: ConditionKind::ValueSet,
    }));
    assert!(session.apply(Command::UpdateFilter {
        index: 0,
        value: FilterValue::value_set(["shipped"]),
    }));
    assert!(session.apply(Command::UpdateAggregation(
        AggregationSpec::default().group_by(["ORDER_STATUS"])
    )));

    let preview = session.preview().await;
    assert!(preview.report.is_clean());
    let sql = preview.sql.expect("sql");
    assert!(sql.starts_with(
        "SELECT ORDER_STATUS, COUNT(*) AS record_count, SUM(ORDER_ID) AS ORDER_ID_total, \
         SUM(CUSTOMER_ID) AS CUSTOMER_ID_total, SUM(AMOUNT) AS AMOUNT_total\n"
    ));
    assert_eq!(session.preview().await.sql.as_deref(), Some(sql.as_str()));
    assert!(warehouse.executed_queries().is_empty());
}

#[tokio::test]
async fn rejected_state_never_reaches_the_warehouse() {
    let warehouse = Arc::new(FakeWarehouse::shop());
    let mut session = Session::new(warehouse.clone());
    session.apply(Command::AddJoin(JoinSpec::new("CUSTOMERS", JoinType::Left, "", "")));

    match session.execute().await {
        ExecutionOutcome::Rejected { report } => {
            assert_eq!(report.errors[0].scope, IssueScope::MainTable);
            assert_eq!(report.errors[1].scope, IssueScope::Join(1));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(warehouse.executed_queries().is_empty());
    assert!(session.preview().await.sql.is_none());
}

#[tokio::test]
async fn execute_returns_rows_and_warnings() {
    let warehouse = Arc::new(FakeWarehouse::shop());
    let mut session = Session::new(warehouse.clone());
    session.apply(select_orders());
    session.apply(Command::AddFilter {
        column: "REGION".into(),
        kind: ConditionKind::Pattern,
    });

    match session.execute().await {
        ExecutionOutcome::Completed {
            sql,
            result,
            warnings,
            ..
        } => {
            assert_eq!(result.row_count(), 1);
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].scope, IssueScope::Filter(1));
            assert_eq!(warehouse.executed_queries(), vec![sql]);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[tokio::test]
async fn execution_failure_is_kept_until_dismissed() {
    let warehouse = Arc::new(FakeWarehouse::shop().with_execution_error("SQL compilation error"));
    let mut session = Session::new(warehouse);
    session.apply(select_orders());

    let ExecutionOutcome::Failed { sql, error } = session.execute().await else {
        panic!("expected failure");
    };
    assert!(error.contains("SQL compilation error"));
    let last = session.last_error().expect("error retained");
    assert_eq!(last.sql, sql);
    assert_eq!(last.message, error);

    // Unrelated edits keep the error around.
    session.apply(Command::AddFilter {
        column: "NOTE".into(),
        kind: ConditionKind::Custom,
    });
    assert!(session.last_error().is_some());

    assert!(session.apply(Command::DismissError));
    assert!(session.last_error().is_none());
    assert!(!session.apply(Command::DismissError));
}

#[tokio::test]
async fn success_clears_previous_failure() {
    let warehouse = Arc::new(FakeWarehouse::shop().with_execution_error("boom"));
    let mut session = Session::new(warehouse.clone());
    session.apply(select_orders());
    assert!(matches!(session.execute().await, ExecutionOutcome::Failed { .. }));
    assert!(session.last_error().is_some());

    warehouse.set_execution_error(None);
    assert!(matches!(session.execute().await, ExecutionOutcome::Completed { .. }));
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn reset_clears_failure() {
    let mut session = Session::new(Arc::new(FakeWarehouse::shop().with_execution_error("boom")));
    session.apply(select_orders());
    session.execute().await;
    assert!(session.last_error().is_some());
    session.apply(Command::Reset);
    assert!(session.last_error().is_none());
}

#[tokio::test]
async fn timeout_is_an_execution_failure() {
    let warehouse = Arc::new(FakeWarehouse::shop().with_delay(Duration::from_millis(200)));
    let config = SqllessConfig::from_toml(
        r#"
        [defaults.query]
        timeout_ms = 20
        "#,
    )
    .unwrap();
    let mut session = Session::with_config(warehouse, &config.for_datasource("fake"));
    session.apply(select_orders());

    match session.execute().await {
        ExecutionOutcome::Failed { error, .. } => assert!(error.contains("timed out")),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn out_of_range_commands_are_noops() {
    let mut session = Session::new(Arc::new(FakeWarehouse::shop()));
    session.apply(select_orders());
    let before = session.state().clone();

    assert!(!session.apply(Command::UpdateFilter {
        index: 4,
        value: FilterValue::custom("1 = 1"),
    }));
    assert!(!session.apply(Command::RemoveFilter { index: 0 }));
    assert!(!session.apply(Command::RemoveJoin { index: 2 }));
    assert!(!session.apply(Command::UpdateJoin {
        index: 0,
        spec: JoinSpec::new("CUSTOMERS", JoinType::Inner, "CUSTOMER_ID", "ID"),
    }));
    assert_eq!(session.state(), &before);
}

#[tokio::test]
async fn join_edits_are_revalidated() {
    let warehouse = Arc::new(FakeWarehouse::shop());
    let mut session = Session::new(warehouse.clone());
    session.apply(select_orders());
    session.apply(Command::AddJoin(JoinSpec::new(
        "CUSTOMERS",
        JoinType::Left,
        "CUSTOMER_ID",
        "ID",
    )));
    assert!(session.preview().await.report.is_clean());

    // The target table loses its key column behind the session's back.
    warehouse.set_columns("CUSTOMERS", &[("CUSTOMER_KEY", "NUMBER"), ("NAME", "VARCHAR")]);
    assert!(session.preview().await.report.is_clean(), "cached description still used");

    session.apply(Command::ReloadCatalog);
    let report = session.preview().await.report;
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].scope, IssueScope::Join(1));

    session.apply(Command::UpdateJoin {
        index: 0,
        spec: JoinSpec::new("CUSTOMERS", JoinType::Left, "CUSTOMER_ID", "CUSTOMER_KEY"),
    });
    assert!(session.preview().await.report.is_clean());
}

#[tokio::test]
async fn reset_restores_configured_defaults() {
    let config = SqllessConfig::from_toml(
        r#"
        [defaults.query]
        default_row_limit = 250
        "#,
    )
    .unwrap();
    let mut manager = ConnectionManager::with_config(config);
    manager.insert("fake", Arc::new(FakeWarehouse::shop()));
    let mut session = manager.session("fake").unwrap();
    assert_eq!(session.state().aggregation.row_limit, Some(250));

    session.apply(select_orders());
    session.apply(Command::UpdateAggregation(
        AggregationSpec::default().with_row_limit(Some(9)),
    ));
    session.apply(Command::Reset);
    assert!(session.state().main_table.is_none());
    assert_eq!(session.state().aggregation.row_limit, Some(250));

    assert!(manager.session("missing").is_err());
}

#[tokio::test]
async fn save_and_load_round_trip_through_store() {
    let mut store = MemoryQueryStore::new();
    let mut session = Session::new(Arc::new(FakeWarehouse::shop()));
    assert!(session
        .save_to(&mut store, "empty", "", &[])
        .await
        .is_err());

    session.apply(select_orders());
    session.apply(Command::AddJoin(JoinSpec::new(
        "CUSTOMERS",
        JoinType::Left,
        "CUSTOMER_ID",
        "ID",
    )));
    session
        .save_to(&mut store, "orders", "orders with customers", &["daily".to_string()])
        .await
        .unwrap();
    let saved_state = session.state().clone();

    session.apply(Command::Reset);
    assert!(session.load_from(&store, "orders").await.unwrap());
    assert_eq!(session.state(), &saved_state);
    assert!(!session.load_from(&store, "missing").await.unwrap());

    let saved = store.load("orders").await.unwrap().unwrap();
    assert_eq!(saved.description, "orders with customers");
    assert_eq!(saved.tags, vec!["daily"]);
}
