#![cfg(feature = "duckdb")]

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use sqlless::config::StoreConfig;
use sqlless::{
    AggregationSpec, Catalog, Command, ConditionKind, DuckDbConnection, ExecutionOutcome,
    FilterKind, FilterValue, JoinSpec, JoinType, QueryState, QueryStore, SavedQuery, Session,
    SortDirection, TableRef, WarehouseConnection, WarehouseQueryStore,
};

fn bootstrap(path: &Path) {
    let conn = duckdb::Connection::open(path).unwrap();
    conn.execute_batch(
        "
        CREATE TABLE customers (id INTEGER, name VARCHAR, region VARCHAR);
        CREATE TABLE orders (
            order_id INTEGER,
            customer_id INTEGER,
            amount DOUBLE,
            order_status VARCHAR,
            created_at DATE
        );
        INSERT INTO customers VALUES (1, 'Alice', 'East'), (2, 'Bob', 'West'), (3, 'Carla', 'East');
        INSERT INTO orders VALUES
            (1, 1, 100.0, 'shipped', '2024-01-01'),
            (2, 1, 50.0, 'pending', '2024-01-02'),
            (3, 2, 25.0, 'shipped', '2024-01-03'),
            (4, 3, 10.0, 'shipped', '2024-02-01');
        ",
    )
    .unwrap();
}

fn shop() -> (tempfile::TempDir, Arc<DuckDbConnection>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.duckdb");
    bootstrap(&path);
    (dir, Arc::new(DuckDbConnection::new(&path)))
}

#[tokio::test]
async fn catalog_browses_and_classifies_real_tables() {
    let (_dir, warehouse) = shop();
    let mut catalog = Catalog::new(warehouse);

    let tree = catalog.browse().await;
    assert_eq!(tree["shop"]["main"], vec!["customers", "orders"]);

    let orders = catalog
        .describe_columns("shop", "main", "orders")
        .await
        .unwrap();
    assert_eq!(
        orders.column_names().collect::<Vec<_>>(),
        vec!["order_id", "customer_id", "amount", "order_status", "created_at"]
    );
    assert_eq!(
        orders.column("amount").unwrap().filter_kind,
        FilterKind::NumericRange
    );
    assert_eq!(
        orders.column("created_at").unwrap().filter_kind,
        FilterKind::DateRange
    );
    let status = orders.column("order_status").unwrap();
    assert_eq!(status.filter_kind, FilterKind::Categorical);
    assert_eq!(
        status.sample_values.as_deref(),
        Some(&["pending".to_string(), "shipped".to_string()][..])
    );

    assert!(catalog
        .describe_columns("shop", "main", "missing")
        .await
        .is_none());
}

#[tokio::test]
async fn session_runs_grouped_join() {
    let (_dir, warehouse) = shop();
    let mut session = Session::new(warehouse);
    session.apply(Command::SelectTable {
        database: "shop".into(),
        schema: "main".into(),
        table: "orders".into(),
    });
    session.apply(Command::AddJoin(JoinSpec::new(
        "customers",
        JoinType::Inner,
        "customer_id",
        "id",
    )));
    session.apply(Command::AddFilter {
        column: "order_status".into(),
        kind: ConditionKind::ValueSet,
    });
    session.apply(Command::UpdateFilter {
        index: 0,
        value: FilterValue::value_set(["shipped"]),
    });
    session.apply(Command::UpdateAggregation(
        AggregationSpec::default()
            .group_by(["region"])
            .sort_by("region", SortDirection::Asc),
    ));

    let ExecutionOutcome::Completed { sql, result, warnings, .. } = session.execute().await else {
        panic!("query did not complete");
    };
    assert!(sql.contains("INNER JOIN shop.main.customers\n  ON orders.customer_id = customers.id"));
    assert!(warnings.is_empty());
    assert_eq!(result.column_strings("region"), vec!["East", "West"]);
    assert_eq!(result.column_strings("record_count"), vec!["2", "1"]);
    assert_eq!(result.column_strings("amount_total"), vec!["110.0", "25.0"]);
}

#[tokio::test]
async fn warehouse_error_is_reported_not_raised() {
    let (_dir, warehouse) = shop();
    let mut session = Session::new(warehouse);
    session.apply(Command::SelectTable {
        database: "shop".into(),
        schema: "main".into(),
        table: "orders".into(),
    });
    session.apply(Command::AddFilter {
        column: "amount".into(),
        kind: ConditionKind::Custom,
    });
    session.apply(Command::UpdateFilter {
        index: 0,
        value: FilterValue::custom("no_such_column > 1"),
    });

    assert!(matches!(
        session.execute().await,
        ExecutionOutcome::Failed { .. }
    ));
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn warehouse_store_round_trip() {
    let (_dir, warehouse) = shop();
    let mut store = WarehouseQueryStore::new(warehouse.clone(), &StoreConfig::default(), "tester");
    store.ensure_table().await.unwrap();

    let mut state = QueryState::for_table(TableRef::new("shop", "main", "orders"));
    state.add_join(JoinSpec::new("customers", JoinType::Left, "customer_id", "id"));
    let first = SavedQuery::from_state(&state).unwrap().with_description("v1");
    store.save("orders", &first).await.unwrap();
    let second = first.clone().with_description("v2").with_tags(["weekly"]);
    store.save("orders", &second).await.unwrap();
    store.save("other", &first).await.unwrap();

    assert_eq!(store.list().await.unwrap(), vec!["orders", "other"]);
    assert_eq!(store.load("orders").await.unwrap(), Some(second));

    let rows = warehouse
        .execute_sql(
            "SELECT version, is_active FROM SQL_TOOL_USER_CONFIGS \
             WHERE config_name = 'orders' ORDER BY version",
        )
        .await
        .unwrap();
    assert_eq!(rows.column_strings("version"), vec!["1", "2"]);
    assert_eq!(
        rows.rows
            .iter()
            .map(|r| r["is_active"].clone())
            .collect::<Vec<_>>(),
        vec![Value::Bool(false), Value::Bool(true)]
    );

    store.delete("orders").await.unwrap();
    assert!(store.load("orders").await.unwrap().is_none());
    assert_eq!(store.list().await.unwrap(), vec!["other"]);

    let stranger = WarehouseQueryStore::new(warehouse, &StoreConfig::default(), "someone_else");
    assert!(stranger.list().await.unwrap().is_empty());
}
