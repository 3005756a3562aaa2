#![cfg(feature = "runtime")]

use std::env;

use anyhow::Result;
use salesmart_core::cleaning::{clean_date_times, clean_products, CleaningOptions};
use salesmart_core::error::StorageError;
use salesmart_core::pipelines::OnConflict;
use salesmart_core::storage::PostgresStorage;
use salesmart_core::db;
use salesmart_sources::{parse_csv, parse_json, CsvOptions};

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../salesmart-sources/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

#[tokio::test]
async fn cleaned_tables_round_trip_through_postgres() -> Result<()> {
    let database_url = match env::var("SALESMART_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping postgres storage test because SALESMART_TEST_DATABASE_URL is not set");
            return Ok(());
        }
    };

    let pool = db::connect(&database_url).await?;
    let storage = PostgresStorage::new(pool.clone());

    let products = clean_products(
        &parse_csv(&fixture("products.csv"), &CsvOptions::default())?.into_dataframe(),
        &CleaningOptions::default(),
    )?;
    let dates = clean_date_times(
        &parse_json(&fixture("date_details.json"))?.into_dataframe(),
        &CleaningOptions::default(),
    )?;

    storage
        .write_table(&products.df, "test_dim_products", OnConflict::Replace)
        .await?;
    storage
        .write_table(&dates.df, "test_dim_date_times", OnConflict::Replace)
        .await?;

    let count: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM test_dim_products")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 5);

    let heaviest: f64 = sqlx::query_scalar::<_, f64>("SELECT MAX(weight) FROM test_dim_products")
        .fetch_one(&pool)
        .await?;
    assert_eq!(heaviest, 1.6);

    let first_time: String = sqlx::query_scalar::<_, String>(
        "SELECT MIN(timestamp)::text FROM test_dim_date_times",
    )
    .fetch_one(&pool)
    .await?;
    assert_eq!(first_time, "10:05:37");

    let conflict = storage
        .write_table(&products.df, "test_dim_products", OnConflict::Fail)
        .await;
    assert!(matches!(conflict, Err(StorageError::TableExists(name)) if name == "test_dim_products"));

    let tables = db::list_tables(&pool).await?;
    assert!(tables.iter().any(|table| table == "test_dim_products"));

    for table in ["test_dim_products", "test_dim_date_times"] {
        sqlx::query(&format!("DROP TABLE {table}")).execute(&pool).await?;
    }
    Ok(())
}
