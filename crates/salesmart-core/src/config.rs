//! Run configuration, read once at start-up and handed to the collaborators
//! that need it.

use std::collections::BTreeMap;
use std::path::Path;

use salesmart_sources::CsvOptions;
use serde::{Deserialize, Serialize};

use crate::cleaning::{CleaningOptions, DEFAULT_YEAR_RANGE};
use crate::entities::Entity;
use crate::error::ConfigError;
use crate::pipelines::{FailurePolicy, OnConflict, RunOptions};

pub const SOURCE_DATABASE_URL_VAR: &str = "SALESMART_SOURCE_DATABASE_URL";
pub const TARGET_DATABASE_URL_VAR: &str = "SALESMART_TARGET_DATABASE_URL";
pub const FALLBACK_DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const STORE_API_KEY_VAR: &str = "SALESMART_STORE_API_KEY";

/// Where an entity's raw table comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// A table in the source database.
    DatabaseTable { table: String },
    /// A CSV or JSON file on local disk.
    LocalFile {
        path: String,
        #[serde(default)]
        csv: CsvOptions,
    },
    /// A JSON document served over HTTP.
    HttpJson { url: String },
    /// The paginated store API configured under `[store_api]`.
    StoreApi,
    /// A CSV or JSON object at an `s3://bucket/key` or `https://` location.
    ObjectStore {
        uri: String,
        #[serde(default)]
        csv: CsvOptions,
    },
}

impl SourceDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceDescriptor::DatabaseTable { .. } => "database_table",
            SourceDescriptor::LocalFile { .. } => "local_file",
            SourceDescriptor::HttpJson { .. } => "http_json",
            SourceDescriptor::StoreApi => "store_api",
            SourceDescriptor::ObjectStore { .. } => "object_store",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreApiConfig {
    /// Endpoint returning `{"number_stores": N}`.
    pub count_url: String,
    /// Per-store endpoint; `{store_number}` is replaced with 0..N.
    pub store_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl StoreApiConfig {
    pub fn store_url_for(&self, store_number: usize) -> String {
        self.store_url
            .replace("{store_number}", &store_number.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: "eu-west-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub first: i64,
    pub last: i64,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            first: *DEFAULT_YEAR_RANGE.start(),
            last: *DEFAULT_YEAR_RANGE.end(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub source_database_url: Option<String>,
    #[serde(default)]
    pub target_database_url: Option<String>,
    #[serde(default)]
    pub store_api: Option<StoreApiConfig>,
    #[serde(default)]
    pub s3: S3Settings,
    #[serde(default)]
    pub on_conflict: OnConflict,
    #[serde(default)]
    pub halt_on_error: bool,
    #[serde(default)]
    pub year_range: YearRange,
    /// Keyed by entity code (`users`, `cards`, ...).
    #[serde(default)]
    pub sources: BTreeMap<String, SourceDescriptor>,
}

impl PipelineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for code in self.sources.keys() {
            code.parse::<Entity>()?;
        }
        self.cleaning_options()?;
        Ok(())
    }

    /// Applies the process environment on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(SOURCE_DATABASE_URL_VAR) {
            self.source_database_url = Some(url);
        }
        if let Some(url) =
            lookup(TARGET_DATABASE_URL_VAR).or_else(|| lookup(FALLBACK_DATABASE_URL_VAR))
        {
            self.target_database_url = Some(url);
        }
        if let Some(key) = lookup(STORE_API_KEY_VAR) {
            if let Some(store_api) = self.store_api.as_mut() {
                store_api.api_key = Some(key);
            }
        }
    }

    pub fn source_for(&self, entity: Entity) -> Result<&SourceDescriptor, ConfigError> {
        self.sources
            .get(entity.code())
            .ok_or_else(|| ConfigError::MissingSource(entity.code().to_string()))
    }

    /// Entities with a configured source, in load order.
    pub fn configured_entities(&self) -> Vec<Entity> {
        Entity::all()
            .iter()
            .copied()
            .filter(|entity| self.sources.contains_key(entity.code()))
            .collect()
    }

    pub fn source_database_url(&self) -> Result<&str, ConfigError> {
        self.source_database_url
            .as_deref()
            .ok_or(ConfigError::MissingSetting(SOURCE_DATABASE_URL_VAR))
    }

    pub fn target_database_url(&self) -> Result<&str, ConfigError> {
        self.target_database_url
            .as_deref()
            .ok_or(ConfigError::MissingSetting(TARGET_DATABASE_URL_VAR))
    }

    pub fn store_api(&self) -> Result<&StoreApiConfig, ConfigError> {
        self.store_api
            .as_ref()
            .ok_or(ConfigError::MissingSetting("store_api"))
    }

    pub fn cleaning_options(&self) -> Result<CleaningOptions, ConfigError> {
        let YearRange { first, last } = self.year_range;
        if first > last {
            return Err(ConfigError::EmptyYearRange {
                start: first,
                end: last,
            });
        }
        Ok(CleaningOptions {
            year_range: first..=last,
        })
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.halt_on_error {
            FailurePolicy::HaltOnFirstError
        } else {
            FailurePolicy::Continue
        }
    }

    pub fn run_options(&self) -> Result<RunOptions, ConfigError> {
        Ok(RunOptions {
            cleaning: self.cleaning_options()?,
            on_conflict: self.on_conflict,
            policy: self.failure_policy(),
        })
    }
}
