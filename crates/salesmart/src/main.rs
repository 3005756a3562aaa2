use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use salesmart_core::{
    config::PipelineConfig,
    db,
    extract::SourceExtractor,
    outputs::write_table_file,
    pipelines::{run_pipeline, FailurePolicy, OnConflict},
    storage::PostgresStorage,
    CleaningOptions, Entity,
};
use salesmart_sources::{parse_located, CsvOptions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Salesmart ETL: extract, clean and load the sales warehouse", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, clean and load entities into the warehouse database
    Run(RunArgs),
    /// Clean one local CSV or JSON file and write the result to disk
    CleanFile(CleanFileArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Pipeline configuration file
    #[arg(long, default_value = "salesmart.toml")]
    config: PathBuf,
    /// Only run these entities (users, cards, stores, products, orders, date_times)
    #[arg(long = "entity", value_name = "CODE")]
    entities: Vec<String>,
    /// Drop and recreate destination tables that already exist
    #[arg(long)]
    replace_existing: bool,
    /// Stop at the first entity that fails
    #[arg(long)]
    halt_on_error: bool,
}

#[derive(Args, Debug)]
struct CleanFileArgs {
    /// Entity whose rules apply to the file
    #[arg(long)]
    entity: String,
    /// Raw CSV or JSON input
    #[arg(long)]
    input: PathBuf,
    /// Cleaned output; `.csv` or `.parquet`
    #[arg(long)]
    output: PathBuf,
    /// Leading lines to discard before the CSV header
    #[arg(long, default_value_t = 0)]
    skip_rows: usize,
    /// Discard the first CSV column as a positional index
    #[arg(long)]
    drop_leading_index: bool,
    /// Earliest year accepted by the date dimension
    #[arg(long)]
    first_year: Option<i64>,
    /// Latest year accepted by the date dimension
    #[arg(long)]
    last_year: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args).await,
        Command::CleanFile(args) => handle_clean_file(args),
    }
}

async fn handle_run(args: RunArgs) -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = PipelineConfig::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    config.apply_env_overrides();

    if args.replace_existing {
        config.on_conflict = OnConflict::Replace;
    }
    if args.halt_on_error {
        config.halt_on_error = true;
    }

    let entities = if args.entities.is_empty() {
        config.configured_entities()
    } else {
        args.entities
            .iter()
            .map(|code| code.parse::<Entity>())
            .collect::<Result<Vec<_>, _>>()?
    };
    if entities.is_empty() {
        bail!("no entities selected and none configured");
    }

    let options = config.run_options()?;
    let target_url = config
        .target_database_url()
        .context("set SALESMART_TARGET_DATABASE_URL (or DATABASE_URL)")?
        .to_string();

    let extractor = SourceExtractor::connect(config).await?;
    let storage = PostgresStorage::new(db::connect(&target_url).await?);

    let halt = options.policy == FailurePolicy::HaltOnFirstError;
    info!(entities = ?entities, halt, "starting run");
    let summary = run_pipeline(&entities, &extractor, &storage, &options).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(integrity) = &summary.integrity {
        if integrity.total_orphans() > 0 {
            warn!(orphans = integrity.total_orphans(), "orders reference unknown dimension keys");
        }
    }
    if summary.has_failures() {
        bail!("{} of {} entities failed", summary.failed(), summary.outcomes.len());
    }
    Ok(())
}

fn handle_clean_file(args: CleanFileArgs) -> Result<()> {
    let entity: Entity = args.entity.parse()?;

    let mut options = CleaningOptions::default();
    let first = args.first_year.unwrap_or(*options.year_range.start());
    let last = args.last_year.unwrap_or(*options.year_range.end());
    if first > last {
        bail!("--first-year {first} is after --last-year {last}");
    }
    options.year_range = first..=last;

    let content = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let csv = CsvOptions {
        skip_rows: args.skip_rows,
        drop_leading_index: args.drop_leading_index,
        ..CsvOptions::default()
    };
    let raw = parse_located(&args.input.to_string_lossy(), &content, &csv)?;
    if raw.skipped_records > 0 {
        warn!(skipped = raw.skipped_records, "malformed records skipped");
    }

    let cleaned = entity.clean(&raw.df, &options)?;
    write_table_file(&cleaned.df, &args.output)?;

    println!("{}", serde_json::to_string_pretty(&cleaned.report)?);
    Ok(())
}
