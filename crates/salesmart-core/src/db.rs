use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

pub type DbPool = Pool<Postgres>;

/// Establish a new Postgres connection pool. Used for both the legacy source
/// database and the warehouse.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .with_context(|| "failed to connect to Postgres")
}

/// Tables in the `public` schema, sorted by name.
pub async fn list_tables(pool: &DbPool) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"SELECT table_name::text
           FROM information_schema.tables
           WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
           ORDER BY table_name"#,
    )
    .fetch_all(pool)
    .await
    .with_context(|| "failed to list database tables")
}

pub async fn table_exists(pool: &DbPool, table: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS (
               SELECT 1 FROM information_schema.tables
               WHERE table_schema = 'public' AND table_name = $1
           )"#,
    )
    .bind(table)
    .fetch_one(pool)
    .await
}

/// Double-quotes an identifier for interpolation into DDL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
