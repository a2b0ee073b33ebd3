use std::{env, fs, path::PathBuf};

use sqlless::{
    dialect::{Dialect, DuckDbDialect, PostgresDialect, SnowflakeDialect},
    CatalogSnapshot, SavedQuery, SqlBuilder, SqllessConfig, Validator,
};

fn usage() {
    eprintln!("Usage: print_sql <saved_query_json> [snowflake|duckdb|postgres]");
    eprintln!("Example: cargo run --example print_sql -- demos/customer_orders.json duckdb");
}

fn main() -> anyhow::Result<()> {
    sqlless::logging::init_tracing();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let query_path = PathBuf::from(args.remove(0));
    let dialect: Box<dyn Dialect> = match args.first().map(String::as_str) {
        None | Some("snowflake") => Box::new(SnowflakeDialect),
        Some("duckdb") => Box::new(DuckDbDialect),
        Some("postgres") => Box::new(PostgresDialect),
        Some(other) => anyhow::bail!("unknown dialect {other}"),
    };

    let saved: SavedQuery = serde_json::from_str(&fs::read_to_string(query_path)?)?;
    let state = saved.to_state();

    // No warehouse here: every table counts as undescribed.
    let snapshot = CatalogSnapshot::new();
    let report = Validator::default().validate(&state, &snapshot);
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    report.into_result()?;

    let config = SqllessConfig::load_default();
    let builder = SqlBuilder::new(&config.defaults.query);
    println!("{}", builder.build_with_dialect(&state, &snapshot, dialect.as_ref())?);
    Ok(())
}
