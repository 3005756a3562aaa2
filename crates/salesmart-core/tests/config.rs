use std::collections::HashMap;

use salesmart_core::config::{PipelineConfig, SourceDescriptor};
use salesmart_core::error::ConfigError;
use salesmart_core::pipelines::{FailurePolicy, OnConflict};
use salesmart_core::Entity;

fn example_config() -> PipelineConfig {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../salesmart.example.toml");
    PipelineConfig::from_path(path).expect("example config parses")
}

#[test]
fn example_config_covers_every_entity() {
    let config = example_config();

    assert_eq!(config.configured_entities(), Entity::all());
    assert_eq!(config.on_conflict, OnConflict::Fail);
    assert_eq!(config.failure_policy(), FailurePolicy::Continue);
    assert_eq!(config.cleaning_options().unwrap().year_range, 1980..=2022);

    match config.source_for(Entity::Cards).unwrap() {
        SourceDescriptor::LocalFile { path, csv } => {
            assert_eq!(path, "data/card_details.csv");
            assert_eq!(csv.skip_rows, 1);
            assert!(csv.drop_leading_index);
            assert!(csv.skip_bad_lines);
        }
        other => panic!("unexpected card source {other:?}"),
    }
    assert_eq!(config.source_for(Entity::Stores).unwrap(), &SourceDescriptor::StoreApi);

    let store_api = config.store_api().unwrap();
    assert!(store_api.store_url_for(17).ends_with("/store_details/17"));
}

#[test]
fn omitted_settings_never_overwrite_tables() {
    let config = PipelineConfig::from_toml_str("", "inline").unwrap();

    assert_eq!(config.on_conflict, OnConflict::Fail);
    assert_eq!(config.run_options().unwrap().on_conflict, OnConflict::Fail);
    assert_eq!(config.failure_policy(), FailurePolicy::Continue);
    assert!(config.configured_entities().is_empty());

    let replacing = PipelineConfig::from_toml_str("on_conflict = \"replace\"\n", "inline").unwrap();
    assert_eq!(replacing.on_conflict, OnConflict::Replace);
}

#[test]
fn environment_overrides_file_values() {
    let mut config = example_config();
    let env: HashMap<&str, &str> = HashMap::from([
        ("SALESMART_SOURCE_DATABASE_URL", "postgres://source/legacy"),
        ("DATABASE_URL", "postgres://warehouse/sales"),
        ("SALESMART_STORE_API_KEY", "secret"),
    ]);

    config.apply_overrides(|name| env.get(name).map(|value| value.to_string()));

    assert_eq!(config.source_database_url().unwrap(), "postgres://source/legacy");
    assert_eq!(config.target_database_url().unwrap(), "postgres://warehouse/sales");
    assert_eq!(config.store_api().unwrap().api_key.as_deref(), Some("secret"));
}

#[test]
fn target_url_prefers_dedicated_variable() {
    let mut config = PipelineConfig::default();
    let env: HashMap<&str, &str> = HashMap::from([
        ("SALESMART_TARGET_DATABASE_URL", "postgres://warehouse/primary"),
        ("DATABASE_URL", "postgres://warehouse/fallback"),
    ]);

    config.apply_overrides(|name| env.get(name).map(|value| value.to_string()));
    assert_eq!(config.target_database_url().unwrap(), "postgres://warehouse/primary");
    assert!(matches!(
        config.source_database_url(),
        Err(ConfigError::MissingSetting("SALESMART_SOURCE_DATABASE_URL"))
    ));
}

#[test]
fn invalid_files_are_rejected() {
    let unknown = PipelineConfig::from_toml_str(
        "[sources.customers]\nkind = \"store_api\"\n",
        "inline",
    );
    assert!(matches!(unknown, Err(ConfigError::UnknownEntity(code)) if code == "customers"));

    let empty_years = PipelineConfig::from_toml_str("[year_range]\nfirst = 2022\nlast = 1980\n", "inline");
    assert!(matches!(empty_years, Err(ConfigError::EmptyYearRange { .. })));

    let malformed = PipelineConfig::from_toml_str("on_conflict = \"merge\"\n", "inline");
    assert!(matches!(malformed, Err(ConfigError::Parse { .. })));

    let missing = PipelineConfig::default();
    assert!(matches!(
        missing.source_for(Entity::Users),
        Err(ConfigError::MissingSource(code)) if code == "users"
    ));
}
