use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use polars::prelude::*;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::cleaning::table::{EPOCH_DAYS_FROM_CE, NANOS_PER_SECOND};
use crate::db::{quote_identifier, table_exists, DbPool};
use crate::error::StorageError;
use crate::pipelines::{OnConflict, Storage};

/// Rows per INSERT; keeps the widest table well under the Postgres bind limit.
const INSERT_BATCH_ROWS: usize = 1_000;

/// One destination column, decoded from polars into bindable values.
enum TypedColumn {
    Text(Vec<Option<String>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Date(Vec<Option<NaiveDate>>),
    Time(Vec<Option<NaiveTime>>),
}

impl TypedColumn {
    fn sql_type(&self) -> &'static str {
        match self {
            TypedColumn::Text(_) => "TEXT",
            TypedColumn::Int(_) => "BIGINT",
            TypedColumn::Float(_) => "DOUBLE PRECISION",
            TypedColumn::Date(_) => "DATE",
            TypedColumn::Time(_) => "TIME",
        }
    }

    fn from_column(column: &Column) -> Result<Self, StorageError> {
        let typed = match column.dtype() {
            DataType::String => TypedColumn::Text(
                column
                    .str()?
                    .into_iter()
                    .map(|value| value.map(str::to_string))
                    .collect(),
            ),
            DataType::Int64 | DataType::Int32 => {
                TypedColumn::Int(column.cast(&DataType::Int64)?.i64()?.into_iter().collect())
            }
            DataType::Float64 | DataType::Float32 => {
                TypedColumn::Float(column.cast(&DataType::Float64)?.f64()?.into_iter().collect())
            }
            DataType::Date => TypedColumn::Date(
                column
                    .cast(&DataType::Int32)?
                    .i32()?
                    .into_iter()
                    .map(|days| {
                        days.and_then(|days| {
                            NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
                        })
                    })
                    .collect(),
            ),
            DataType::Time => TypedColumn::Time(
                column
                    .cast(&DataType::Int64)?
                    .i64()?
                    .into_iter()
                    .map(|nanos| {
                        nanos.and_then(|nanos| {
                            let seconds = u32::try_from(nanos / NANOS_PER_SECOND).ok()?;
                            let fraction = u32::try_from(nanos % NANOS_PER_SECOND).ok()?;
                            NaiveTime::from_num_seconds_from_midnight_opt(seconds, fraction)
                        })
                    })
                    .collect(),
            ),
            other => {
                return Err(StorageError::UnsupportedType {
                    column: column.name().to_string(),
                    dtype: other.to_string(),
                })
            }
        };
        Ok(typed)
    }
}

/// Writes cleaned tables into the warehouse database.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: DbPool,
}

impl PostgresStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn write_table(
        &self,
        table: &DataFrame,
        destination: &str,
        on_conflict: OnConflict,
    ) -> Result<(), StorageError> {
        let exists = table_exists(&self.pool, destination).await?;
        if exists && on_conflict == OnConflict::Fail {
            return Err(StorageError::TableExists(destination.to_string()));
        }

        let names: Vec<String> = table
            .get_column_names()
            .into_iter()
            .map(|name| quote_identifier(name.as_str()))
            .collect();
        let columns = table
            .get_columns()
            .iter()
            .map(TypedColumn::from_column)
            .collect::<Result<Vec<_>, _>>()?;

        let quoted_table = quote_identifier(destination);
        let definitions = names
            .iter()
            .zip(columns.iter())
            .map(|(name, column)| format!("{name} {}", column.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut tx = self.pool.begin().await?;

        if exists {
            debug!(table = destination, "dropping existing table");
            sqlx::query(&format!("DROP TABLE {quoted_table}"))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query(&format!("CREATE TABLE {quoted_table} ({definitions})"))
            .execute(&mut *tx)
            .await?;

        let insert_prefix = format!("INSERT INTO {quoted_table} ({}) ", names.join(", "));
        let height = table.height();
        let mut start = 0;
        while start < height {
            let end = (start + INSERT_BATCH_ROWS).min(height);
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&insert_prefix);
            builder.push_values(start..end, |mut row, idx| {
                for column in &columns {
                    match column {
                        TypedColumn::Text(values) => {
                            row.push_bind(values[idx].clone());
                        }
                        TypedColumn::Int(values) => {
                            row.push_bind(values[idx]);
                        }
                        TypedColumn::Float(values) => {
                            row.push_bind(values[idx]);
                        }
                        TypedColumn::Date(values) => {
                            row.push_bind(values[idx]);
                        }
                        TypedColumn::Time(values) => {
                            row.push_bind(values[idx]);
                        }
                    }
                }
            });
            builder.build().execute(&mut *tx).await?;
            start = end;
        }

        tx.commit().await?;
        info!(table = destination, rows = height, "table written");
        Ok(())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn persist(
        &self,
        table: &DataFrame,
        destination: &str,
        on_conflict: OnConflict,
    ) -> Result<()> {
        self.write_table(table, destination, on_conflict).await?;
        Ok(())
    }
}
