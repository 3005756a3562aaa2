//! Raw table extraction from the configured sources.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use salesmart_sources::{
    parse_json, parse_located, table_from_records, CsvOptions, RawTable,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{PipelineConfig, SourceDescriptor, StoreApiConfig};
use crate::db::{self, quote_identifier, DbPool};
use crate::entities::Entity;
use crate::object_store::{ObjectLocation, ObjectStore};
use crate::pipelines::Extractor;

const API_KEY_HEADER: &str = "x-api-key";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to create HTTP client")
}

#[derive(Debug, Deserialize)]
struct StoreCount {
    number_stores: usize,
}

/// Client for the store API: one endpoint for the store count, one per store.
#[derive(Clone)]
pub struct StoreApiClient {
    http: reqwest::Client,
    config: StoreApiConfig,
}

impl StoreApiClient {
    pub fn new(http: reqwest::Client, config: StoreApiConfig) -> Self {
        Self { http, config }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut request = self.http.get(url);
        if let Some(key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("{url} responded with {status}");
        }
        response
            .json::<Value>()
            .await
            .with_context(|| format!("{url} returned invalid JSON"))
    }

    pub async fn number_of_stores(&self) -> Result<usize> {
        let body = self.get_json(&self.config.count_url).await?;
        let count: StoreCount =
            serde_json::from_value(body).context("store count response has no number_stores")?;
        Ok(count.number_stores)
    }

    pub async fn fetch_store(&self, store_number: usize) -> Result<Value> {
        self.get_json(&self.config.store_url_for(store_number)).await
    }

    pub async fn fetch_all_stores(&self) -> Result<RawTable> {
        let count = self.number_of_stores().await?;
        info!(count, "fetching stores");

        let mut records = Vec::with_capacity(count);
        for store_number in 0..count {
            records.push(self.fetch_store(store_number).await?);
        }
        Ok(table_from_records(&records)?)
    }
}

/// Resolves each entity to its configured [`SourceDescriptor`] and decodes
/// the payload into a raw table.
pub struct SourceExtractor {
    config: PipelineConfig,
    http: reqwest::Client,
    source_pool: Option<DbPool>,
    object_store: Option<ObjectStore>,
}

impl SourceExtractor {
    /// Opens only the connections the configured sources need.
    pub async fn connect(config: PipelineConfig) -> Result<Self> {
        let descriptors: Vec<&SourceDescriptor> = config.sources.values().collect();

        let needs_database = descriptors
            .iter()
            .any(|source| matches!(source, SourceDescriptor::DatabaseTable { .. }));
        let source_pool = if needs_database {
            Some(db::connect(config.source_database_url()?).await?)
        } else {
            None
        };

        let needs_s3 = descriptors.iter().any(|source| {
            matches!(source, SourceDescriptor::ObjectStore { uri, .. } if uri.starts_with("s3://"))
        });
        let object_store = if needs_s3 {
            Some(ObjectStore::new(&config.s3).await?)
        } else {
            None
        };

        Ok(Self {
            http: http_client()?,
            config,
            source_pool,
            object_store,
        })
    }

    async fn read_database_table(&self, table: &str) -> Result<RawTable> {
        let pool = self
            .source_pool
            .as_ref()
            .context("source database is not connected")?;
        let sql = format!("SELECT row_to_json(t)::text FROM {} AS t", quote_identifier(table));
        let rows: Vec<String> = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(pool)
            .await
            .with_context(|| format!("failed to read source table {table}"))?;

        let records = rows
            .iter()
            .map(|row| serde_json::from_str::<Value>(row))
            .collect::<Result<Vec<_>, _>>()
            .context("source row is not valid JSON")?;
        Ok(table_from_records(&records)?)
    }

    async fn read_local_file(&self, path: &str, csv: &CsvOptions) -> Result<RawTable> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {path}"))?;
        Ok(parse_located(path, &content, csv)?)
    }

    async fn read_http_json(&self, url: &str) -> Result<RawTable> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("{url} responded with {status}");
        }
        let body = response.bytes().await?;
        Ok(parse_json(&body)?)
    }

    async fn read_object(&self, uri: &str, csv: &CsvOptions) -> Result<RawTable> {
        let content = if uri.starts_with("s3://") {
            let store = self
                .object_store
                .as_ref()
                .context("object storage is not configured")?;
            store.get_object(&ObjectLocation::parse(uri)?).await?
        } else {
            let response = self
                .http
                .get(uri)
                .send()
                .await
                .with_context(|| format!("request to {uri} failed"))?;
            let status = response.status();
            if !status.is_success() {
                bail!("{uri} responded with {status}");
            }
            response.bytes().await?
        };
        Ok(parse_located(uri, &content, csv)?)
    }

    pub async fn extract_raw(&self, entity: Entity) -> Result<RawTable> {
        let source = self.config.source_for(entity)?;
        debug!(entity = entity.code(), kind = source.kind(), "resolving source");

        let table = match source {
            SourceDescriptor::DatabaseTable { table } => self.read_database_table(table).await?,
            SourceDescriptor::LocalFile { path, csv } => self.read_local_file(path, csv).await?,
            SourceDescriptor::HttpJson { url } => self.read_http_json(url).await?,
            SourceDescriptor::StoreApi => {
                StoreApiClient::new(self.http.clone(), self.config.store_api()?.clone())
                    .fetch_all_stores()
                    .await?
            }
            SourceDescriptor::ObjectStore { uri, csv } => self.read_object(uri, csv).await?,
        };

        info!(
            entity = entity.code(),
            rows = table.height(),
            skipped_records = table.skipped_records,
            "extracted"
        );
        Ok(table)
    }
}

#[async_trait]
impl Extractor for SourceExtractor {
    async fn extract(&self, entity: Entity) -> Result<DataFrame> {
        Ok(self.extract_raw(entity).await?.into_dataframe())
    }
}
