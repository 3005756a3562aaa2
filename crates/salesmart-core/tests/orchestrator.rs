use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use polars::prelude::DataFrame;
use salesmart_core::cleaning::CleaningOptions;
use salesmart_core::pipelines::{
    run_entity, run_pipeline, EntityOutcome, Extractor, FailurePolicy, OnConflict, RunOptions,
    Storage,
};
use salesmart_core::Entity;
use salesmart_sources::{parse_csv, parse_json, CsvOptions};

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../salesmart-sources/tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

/// Serves the fixture files; entities listed in `broken` fail to extract.
struct FixtureExtractor {
    broken: HashSet<Entity>,
}

impl FixtureExtractor {
    fn new() -> Self {
        Self {
            broken: HashSet::new(),
        }
    }

    fn failing(entities: &[Entity]) -> Self {
        Self {
            broken: entities.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl Extractor for FixtureExtractor {
    async fn extract(&self, entity: Entity) -> Result<DataFrame> {
        if self.broken.contains(&entity) {
            bail!("source for {entity} is unreachable");
        }
        let table = match entity {
            Entity::Users => parse_csv(&fixture("legacy_users.csv"), &CsvOptions::default())?,
            Entity::Cards => parse_csv(
                &fixture("card_details.csv"),
                &CsvOptions {
                    skip_rows: 1,
                    drop_leading_index: true,
                    ..CsvOptions::default()
                },
            )?,
            Entity::Stores => parse_csv(&fixture("store_details.csv"), &CsvOptions::default())?,
            Entity::Products => parse_csv(&fixture("products.csv"), &CsvOptions::default())?,
            Entity::Orders => parse_csv(&fixture("orders_table.csv"), &CsvOptions::default())?,
            Entity::DateTimes => parse_json(&fixture("date_details.json"))?,
        };
        Ok(table.into_dataframe())
    }
}

/// Keeps persisted tables in memory and honours the conflict policy.
#[derive(Default)]
struct MemoryStorage {
    tables: Mutex<BTreeMap<String, DataFrame>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryStorage {
    fn with_existing(name: &str) -> Self {
        let storage = Self::default();
        storage
            .tables
            .lock()
            .unwrap()
            .insert(name.to_string(), DataFrame::empty());
        storage
    }

    fn height_of(&self, name: &str) -> Option<usize> {
        self.tables.lock().unwrap().get(name).map(DataFrame::height)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn persist(
        &self,
        table: &DataFrame,
        destination: &str,
        on_conflict: OnConflict,
    ) -> Result<()> {
        let mut tables = self.tables.lock().map_err(|_| anyhow!("storage poisoned"))?;
        if on_conflict == OnConflict::Fail && tables.contains_key(destination) {
            bail!("destination table `{destination}` already exists");
        }
        tables.insert(destination.to_string(), table.clone());
        self.writes
            .lock()
            .map_err(|_| anyhow!("storage poisoned"))?
            .push(destination.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn full_run_loads_every_destination() {
    let storage = MemoryStorage::default();
    let summary = run_pipeline(
        Entity::all(),
        &FixtureExtractor::new(),
        &storage,
        &RunOptions::default(),
    )
    .await;

    assert_eq!(summary.loaded(), 6);
    assert!(!summary.has_failures());
    assert_eq!(storage.height_of("dim_users"), Some(4));
    assert_eq!(storage.height_of("dim_card_details"), Some(10));
    assert_eq!(storage.height_of("dim_store_details"), Some(3));
    assert_eq!(storage.height_of("dim_products"), Some(5));
    assert_eq!(storage.height_of("orders_table"), Some(2));
    assert_eq!(storage.height_of("dim_date_times"), Some(5));

    let integrity = summary.integrity.expect("orders were loaded");
    assert_eq!(integrity.orphans("store_code"), Some(2));
    assert_eq!(integrity.orphans("user_uuid"), Some(0));
}

#[tokio::test]
async fn entities_run_in_load_order_once() {
    let storage = MemoryStorage::default();
    run_pipeline(
        &[Entity::DateTimes, Entity::Users, Entity::DateTimes],
        &FixtureExtractor::new(),
        &storage,
        &RunOptions::default(),
    )
    .await;

    let writes = storage.writes.lock().unwrap().clone();
    assert_eq!(writes, vec!["dim_users", "dim_date_times"]);
}

#[tokio::test]
async fn failures_are_isolated_when_continuing() {
    let storage = MemoryStorage::default();
    let summary = run_pipeline(
        Entity::all(),
        &FixtureExtractor::failing(&[Entity::Cards]),
        &storage,
        &RunOptions::default(),
    )
    .await;

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.loaded(), 5);
    assert!(summary.skipped.is_empty());

    let failed = summary
        .outcomes
        .iter()
        .find(|outcome| !outcome.is_loaded())
        .expect("one failure");
    assert_eq!(failed.entity(), Entity::Cards);
    match failed {
        EntityOutcome::Failed { error, .. } => assert!(error.contains("unreachable")),
        other => panic!("unexpected outcome {other:?}"),
    }

    let integrity = summary.integrity.expect("orders were loaded");
    assert_eq!(integrity.orphans("card_number"), None);
}

#[tokio::test]
async fn halting_skips_remaining_entities() {
    let storage = MemoryStorage::default();
    let options = RunOptions {
        policy: FailurePolicy::HaltOnFirstError,
        ..RunOptions::default()
    };
    let summary = run_pipeline(
        Entity::all(),
        &FixtureExtractor::failing(&[Entity::Stores]),
        &storage,
        &options,
    )
    .await;

    assert_eq!(summary.loaded(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(
        summary.skipped,
        vec![Entity::Products, Entity::Orders, Entity::DateTimes]
    );
    assert!(summary.integrity.is_none());
}

#[tokio::test]
async fn existing_tables_are_kept_unless_replace_is_requested() {
    let storage = MemoryStorage::with_existing("dim_users");
    let options = RunOptions::default();
    assert_eq!(options.on_conflict, OnConflict::Fail);

    let err = run_entity(Entity::Users, &FixtureExtractor::new(), &storage, &options)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("already exists"));
    assert_eq!(storage.height_of("dim_users"), Some(0));

    let replace = RunOptions {
        on_conflict: OnConflict::Replace,
        ..RunOptions::default()
    };
    let replaced = run_entity(Entity::Users, &FixtureExtractor::new(), &storage, &replace).await;
    assert!(replaced.is_ok());
    assert_eq!(storage.height_of("dim_users"), Some(4));
}

#[tokio::test]
async fn year_range_flows_into_cleaning() {
    let storage = MemoryStorage::default();
    let options = RunOptions {
        cleaning: CleaningOptions {
            year_range: 1970..=2022,
        },
        ..RunOptions::default()
    };
    let (df, report) = run_entity(Entity::DateTimes, &FixtureExtractor::new(), &storage, &options)
        .await
        .expect("date dimension loads");
    assert_eq!(df.height(), 6);
    assert_eq!(report.rows_out, 6);
}

#[tokio::test]
async fn summary_serialises_for_operators() {
    let summary = run_pipeline(
        &[Entity::Products],
        &FixtureExtractor::new(),
        &MemoryStorage::default(),
        &RunOptions::default(),
    )
    .await;

    let json = serde_json::to_value(&summary).expect("summary serialises");
    assert_eq!(json["outcomes"][0]["status"], "loaded");
    assert_eq!(json["outcomes"][0]["destination"], "dim_products");
    assert_eq!(json["outcomes"][0]["report"]["rows_out"], 5);
}
