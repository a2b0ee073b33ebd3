use std::{fs, path::Path, sync::Arc};

use sqlless::{
    AggregationSpec, Command, ConditionKind, DuckDbConnection, ExecutionOutcome, FileQueryStore,
    FilterValue, JoinSpec, JoinType, Session, SortDirection,
};

fn bootstrap_duckdb(path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(path)?;
    conn.execute_batch(
        "
        CREATE TABLE customers (
            id INTEGER PRIMARY KEY,
            name VARCHAR,
            region VARCHAR
        );
        CREATE TABLE orders (
            order_id INTEGER PRIMARY KEY,
            customer_id INTEGER,
            amount DOUBLE,
            order_status VARCHAR,
            created_at DATE
        );
        INSERT INTO customers VALUES
            (1, 'Alice', 'East'),
            (2, 'Bob', 'West'),
            (3, 'Carla', 'East');
        INSERT INTO orders VALUES
            (1, 1, 100.0, 'shipped', '2024-01-01'),
            (2, 1, 50.0, 'pending', '2024-01-02'),
            (3, 2, 25.0, 'shipped', '2024-01-03');
        ",
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlless::logging::init_tracing();

    let dir = std::env::temp_dir().join("sqlless_demo");
    fs::create_dir_all(&dir)?;
    let db_path = dir.join("shop.duckdb");
    if db_path.exists() {
        fs::remove_file(&db_path)?;
    }
    bootstrap_duckdb(&db_path)?;

    let warehouse = Arc::new(DuckDbConnection::new(&db_path));
    let mut session = Session::new(warehouse);

    let tree = session.catalog_mut().browse().await;
    println!("catalog: {tree:?}");

    session.apply(Command::SelectTable {
        database: "shop".into(),
        schema: "main".into(),
        table: "orders".into(),
    });
    session.apply(Command::AddJoin(JoinSpec::new(
        "customers",
        JoinType::Left,
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

    match session.execute().await {
        ExecutionOutcome::Completed {
            sql,
            result,
            elapsed,
            warnings,
        } => {
            println!("{sql}\n");
            for warning in warnings {
                println!("warning: {warning}");
            }
            println!("{} rows in {elapsed:?}", result.row_count());
            for row in result.rows {
                println!("{row:?}");
            }
        }
        ExecutionOutcome::Rejected { report } => {
            for error in report.errors {
                println!("error: {error}");
            }
        }
        ExecutionOutcome::CompileFailed { message } => println!("compile failed: {message}"),
        ExecutionOutcome::Failed { sql, error } => println!("{error}\n{sql}"),
    }

    let mut store = FileQueryStore::open(dir.join("saved_queries.json"))?;
    session
        .save_to(&mut store, "shipped_by_region", "shipped orders per region", &[])
        .await?;
    println!("saved to {}", store.path().display());
    Ok(())
}
